use crate::propagator::{spread_ban, Contradiction, PropagationContext, PropagationStrategy};
use crate::wave::{Ban, Wave};

/// Depth-first propagation over a LIFO stack. Deterministic for a given seed.
#[derive(Debug, Clone, Default)]
pub struct SequentialPropagator {
    stack: Vec<Ban>,
    scratch: Vec<Ban>,
}

impl SequentialPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    pub(crate) fn extend(&mut self, bans: impl IntoIterator<Item = Ban>) {
        self.stack.extend(bans);
    }
}

impl PropagationStrategy for SequentialPropagator {
    fn reset(&mut self) {
        self.stack.clear();
    }

    fn push(&mut self, ban: Ban) {
        self.stack.push(ban);
    }

    fn propagate(&mut self, wave: &mut Wave, ctx: PropagationContext<'_>) -> Result<usize, Contradiction> {
        let mut cascaded = 0;
        while let Some(ban) = self.stack.pop() {
            self.scratch.clear();
            let result = spread_ban(wave, ban, ctx, &mut self.scratch);
            cascaded += self.scratch.len();
            self.stack.extend_from_slice(&self.scratch);
            if let Err(contradiction) = result {
                self.stack.clear();
                return Err(contradiction);
            }
        }
        Ok(cascaded)
    }
}
