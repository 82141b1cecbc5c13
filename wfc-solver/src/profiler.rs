//! Scoped timing of solver stages.
//!
//! A [`Profiler`] is handed to a solver explicitly; each stage opens a guard
//! that records its elapsed time when dropped. Clones share the same metrics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Profiler {
    name: String,
    metrics: Arc<Mutex<HashMap<String, ProfileMetric>>>,
}

/// Timings of one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileMetric {
    pub calls: usize,
    pub total_time: Duration,
    pub min_time: Duration,
    pub max_time: Duration,
}

/// Records the time since its creation into the profiler when dropped.
pub struct ProfilerGuard<'a> {
    profiler: &'a Profiler,
    section: &'static str,
    start_time: Instant,
}

impl Profiler {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            metrics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts timing `section` until the returned guard drops.
    pub fn profile(&self, section: &'static str) -> ProfilerGuard<'_> {
        ProfilerGuard {
            profiler: self,
            section,
            start_time: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ProfileMetric>> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_metrics(&self) -> HashMap<String, ProfileMetric> {
        self.lock().clone()
    }

    /// Sections sorted by total time, longest first.
    pub fn sorted_metrics(&self) -> Vec<(String, ProfileMetric)> {
        let mut sections: Vec<_> = self.get_metrics().into_iter().collect();
        sections.sort_by(|a, b| b.1.total_time.cmp(&a.1.total_time).then_with(|| a.0.cmp(&b.0)));
        sections
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    fn record(&self, section: &str, elapsed: Duration) {
        self.lock()
            .entry(section.to_owned())
            .and_modify(|metric| {
                metric.calls += 1;
                metric.total_time += elapsed;
                metric.min_time = metric.min_time.min(elapsed);
                metric.max_time = metric.max_time.max(elapsed);
            })
            .or_insert(ProfileMetric {
                calls: 1,
                total_time: elapsed,
                min_time: elapsed,
                max_time: elapsed,
            });
    }
}

impl Drop for ProfilerGuard<'_> {
    fn drop(&mut self) {
        self.profiler.record(self.section, self.start_time.elapsed());
    }
}

impl ProfileMetric {
    pub fn average_time(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(calls) => self.total_time / calls,
        }
    }
}

/// Human-readable duration with a unit suited to its magnitude.
pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs() > 0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if duration.as_millis() > 0 {
        format!("{:.2}ms", duration.as_secs_f64() * 1e3)
    } else if duration.as_micros() > 0 {
        format!("{:.2}µs", duration.as_secs_f64() * 1e6)
    } else {
        format!("{}ns", duration.as_nanos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_profiler_multiple_sections() {
        let profiler = Profiler::new("Test");
        {
            let _guard = profiler.profile("section_a");
            thread::sleep(Duration::from_millis(5));
        }
        {
            let _guard = profiler.profile("section_b");
            thread::sleep(Duration::from_millis(10));
        }
        {
            let _guard = profiler.profile("section_a");
            thread::sleep(Duration::from_millis(5));
        }

        let metrics = profiler.get_metrics();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics["section_a"].calls, 2);
        assert!(metrics["section_a"].total_time >= Duration::from_millis(10));
        assert!(metrics["section_a"].min_time <= metrics["section_a"].max_time);
        assert_eq!(metrics["section_b"].calls, 1);
    }

    #[test]
    fn clones_share_metrics() {
        let profiler = Profiler::new("Shared");
        let clone = profiler.clone();
        drop(clone.profile("observe"));
        assert_eq!(profiler.get_metrics()["observe"].calls, 1);
        profiler.reset();
        assert!(clone.get_metrics().is_empty());
    }

    #[test]
    fn format_duration_picks_units() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
        assert_eq!(format_duration(Duration::from_nanos(12)), "12ns");
    }
}
