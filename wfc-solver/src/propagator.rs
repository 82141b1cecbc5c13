//! Constraint propagation strategies.

pub mod phased;
pub mod sequential;

pub use phased::{PhasedPropagator, DEFAULT_PARALLEL_THRESHOLD};
pub use sequential::SequentialPropagator;

use crate::wave::{Ban, Wave};
use std::fmt::Debug;
use wfc_catalog::{BlockWeights, Catalog};

/// A cell that lost its last candidate during propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contradiction {
    pub cell: usize,
}

/// Read-only tables consulted while propagating.
#[derive(Debug, Clone, Copy)]
pub struct PropagationContext<'a> {
    pub catalog: &'a Catalog,
    pub weights: &'a BlockWeights,
}

/// Drains pending bans, cascading support loss through the wave.
pub trait PropagationStrategy: Send + Debug {
    /// Drops pending bans and restores the initial mode for a new attempt.
    fn reset(&mut self);

    /// Queues a ban that was already applied to the wave.
    fn push(&mut self, ban: Ban);

    /// Processes queued bans until none remain.
    ///
    /// Returns the number of cascaded bans, or the first cell left without
    /// candidates.
    fn propagate(&mut self, wave: &mut Wave, ctx: PropagationContext<'_>) -> Result<usize, Contradiction>;
}

/// Pushes the effect of one ban onto every neighbour inside the region.
pub(crate) fn spread_ban(
    wave: &mut Wave,
    ban: Ban,
    ctx: PropagationContext<'_>,
    out: &mut Vec<Ban>,
) -> Result<(), Contradiction> {
    for direction in wfc_catalog::Direction::ALL {
        let Some(neighbour) = wave.neighbour(ban.cell, direction) else {
            continue;
        };
        let emptied = wave.cell_mut(neighbour).retract(
            neighbour,
            direction.opposite(),
            ban.block,
            ctx.catalog,
            ctx.weights,
            out,
        );
        if emptied {
            return Err(Contradiction { cell: neighbour });
        }
    }
    Ok(())
}
