//! History Log: bounded, newest-first record buffer

use std::collections::VecDeque;

use crate::types::AnalysisRecord;
use crate::DEFAULT_HISTORY_CAPACITY;

/// Fixed-capacity log; pushing onto a full log evicts the oldest record
#[derive(Debug, Clone)]
pub struct HistoryLog {
    records: VecDeque<AnalysisRecord>,
    capacity: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryLog {
    /// Capacity is validated by the session config; zero is bumped to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the front, returning the evicted record if the log was full
    pub fn push(&mut self, record: AnalysisRecord) -> Option<AnalysisRecord> {
        self.records.push_front(record);
        if self.records.len() > self.capacity {
            self.records.pop_back()
        } else {
            None
        }
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&AnalysisRecord> {
        self.records.front()
    }

    pub fn to_vec(&self) -> Vec<AnalysisRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::{verdict_from_scores, ScoreBuckets};
    use crate::types::{Gaze, Sample, SessionAggregates};
    use chrono::Utc;

    fn record(tick: u64) -> AnalysisRecord {
        let sample = Sample::new(tick, Utc::now(), Gaze::Center);
        let agg = SessionAggregates::compute(0, 1.0, 40);
        let verdict = verdict_from_scores(ScoreBuckets::default(), "neutral".into());
        AnalysisRecord::new(&sample, &agg, verdict)
    }

    #[test]
    fn test_newest_first() {
        let mut log = HistoryLog::new(10);
        for tick in 0..3 {
            log.push(record(tick));
        }
        let ticks: Vec<u64> = log.iter().map(|r| r.tick).collect();
        assert_eq!(ticks, vec![2, 1, 0]);
        assert_eq!(log.latest().map(|r| r.tick), Some(2));
    }

    #[test]
    fn test_evicts_oldest_past_capacity() {
        let mut log = HistoryLog::new(10);
        for tick in 0..10 {
            assert!(log.push(record(tick)).is_none());
        }
        let evicted = log.push(record(10));
        assert_eq!(evicted.map(|r| r.tick), Some(0));
        assert_eq!(log.len(), 10);
        assert!(log.iter().all(|r| r.tick != 0));
        assert_eq!(log.iter().last().map(|r| r.tick), Some(1));
    }

    #[test]
    fn test_clear() {
        let mut log = HistoryLog::new(2);
        log.push(record(0));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.capacity(), 2);
    }
}
