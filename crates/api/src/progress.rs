//! Batch progress reporting.

use std::sync::Arc;

/// Receives progress updates while a batch runs.
///
/// A report is sent each time a fetch attempt reaches a terminal state,
/// whatever the outcome. Reports may arrive from any task.
pub trait ProgressReporter: 'static + Send + Sync + std::fmt::Debug {
    /// Percentage of attempts that have completed, 0 to 100.
    fn report(&self, percent_complete: u8);
}

/// Trait-object [ProgressReporter].
pub type DynProgressReporter = Arc<dyn ProgressReporter>;

/// Integer percentage of `done` out of `total`. An empty batch is
/// complete.
pub fn percent_complete(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done.min(total) * 100) / total) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn percent_complete_rounds_down() {
        assert_eq!(0, percent_complete(0, 3));
        assert_eq!(33, percent_complete(1, 3));
        assert_eq!(66, percent_complete(2, 3));
        assert_eq!(100, percent_complete(3, 3));
        assert_eq!(100, percent_complete(0, 0));
        assert_eq!(100, percent_complete(5, 3));
    }
}
