use std::collections::HashSet;

use crate::models::job::JobStatus;

/// Pure fold over chunk-status events deciding when a session is done.
///
/// Each chunk counts toward completion exactly once, no matter how many
/// terminal events the bus delivers for it; non-terminal events never
/// advance the count.
#[derive(Debug)]
pub struct ChunkAggregator {
    total: usize,
    terminal: HashSet<usize>,
    any_failed: bool,
}

impl ChunkAggregator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            terminal: HashSet::new(),
            any_failed: false,
        }
    }

    /// Fold one chunk-status event. Returns `true` once every chunk has
    /// reached a terminal state.
    pub fn observe(&mut self, chunk: usize, status: JobStatus) -> bool {
        if status.is_terminal() && self.terminal.insert(chunk) && status == JobStatus::Failed {
            self.any_failed = true;
        }
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.terminal.len() >= self.total
    }

    pub fn completed_count(&self) -> usize {
        self.terminal.len()
    }

    pub fn any_failed(&self) -> bool {
        self.any_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completes_only_when_every_chunk_terminal() {
        let mut agg = ChunkAggregator::new(3);
        assert!(!agg.observe(0, JobStatus::Completed));
        assert!(!agg.observe(1, JobStatus::Completed));
        assert!(agg.observe(2, JobStatus::Completed));
        assert_eq!(agg.completed_count(), 3);
    }

    #[test]
    fn test_duplicate_terminal_events_count_once() {
        let mut agg = ChunkAggregator::new(2);
        assert!(!agg.observe(0, JobStatus::Completed));
        assert!(!agg.observe(0, JobStatus::Completed));
        assert!(!agg.observe(0, JobStatus::Failed));
        assert_eq!(agg.completed_count(), 1);
        assert!(agg.observe(1, JobStatus::Completed));
    }

    #[test]
    fn test_non_terminal_events_ignored() {
        let mut agg = ChunkAggregator::new(1);
        assert!(!agg.observe(0, JobStatus::Pending));
        assert!(!agg.observe(0, JobStatus::Processing));
        assert_eq!(agg.completed_count(), 0);
        assert!(agg.observe(0, JobStatus::Completed));
    }

    #[test]
    fn test_mixed_outcomes_complete_in_any_order() {
        // 3 chunks: two complete, one fails; fires on the third event
        // regardless of arrival order.
        let mut agg = ChunkAggregator::new(3);
        assert!(!agg.observe(2, JobStatus::Failed));
        assert!(!agg.observe(0, JobStatus::Completed));
        assert!(agg.observe(1, JobStatus::Completed));
        assert!(agg.any_failed());
    }

    #[test]
    fn test_single_chunk_session() {
        let mut agg = ChunkAggregator::new(1);
        assert!(agg.observe(0, JobStatus::Failed));
        assert!(agg.any_failed());
    }
}
