//! Replay memory storage, eviction and sampling.

use std::collections::VecDeque;

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::transition::TransitionRecord;
use crate::error::{CoordinatorError, Result};

/// Priority used for records pushed without one.
const DEFAULT_PRIORITY: f64 = 1.0;

/// Floor for non-positive or non-finite priorities, so every record stays sampleable.
const MIN_PRIORITY: f64 = 1e-6;

/// How the memory evicts and samples.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReplayMode {
    /// FIFO eviction, uniform sampling.
    Uniform,
    /// Lowest-priority eviction, sampling proportional to `priority^alpha`.
    Prioritized { alpha: f64 },
}

/// Occupancy summary for external reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReplayBufferStats {
    pub size: usize,
    pub capacity: usize,
    pub utilization_percent: f64,
}

/// Bounded store of transitions.
///
/// The memory never holds more than `capacity` records. Each [`push`] either
/// inserts, or inserts and evicts exactly one record.
///
/// The memory itself is not synchronized; the coordinator serializes access.
///
/// [`push`]: ReplayMemory::push
#[derive(Debug, Clone)]
pub struct ReplayMemory {
    /// Stored records, oldest at the front.
    records: VecDeque<TransitionRecord>,
    capacity: usize,
    mode: ReplayMode,
}

impl ReplayMemory {
    /// Creates an empty memory.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if `capacity == 0`, or if a prioritized mode has a
    /// non-positive or non-finite `alpha`.
    pub fn new(capacity: usize, mode: ReplayMode) -> Result<Self> {
        if capacity == 0 {
            return Err(CoordinatorError::configuration(
                "replay capacity must be > 0",
            ));
        }
        if let ReplayMode::Prioritized { alpha } = mode {
            if !alpha.is_finite() || alpha <= 0.0 {
                return Err(CoordinatorError::configuration(format!(
                    "priority alpha must be > 0, got {}",
                    alpha
                )));
            }
        }
        Ok(Self {
            records: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
            mode,
        })
    }

    /// Appends a record, evicting one held entry first if the memory is full.
    ///
    /// Returns the evicted record, if any. Uniform mode evicts the oldest
    /// record; prioritized mode evicts the lowest-priority record, oldest
    /// first among ties. The pushed record is always held afterwards.
    pub fn push(&mut self, record: TransitionRecord) -> Option<TransitionRecord> {
        let evicted = if self.records.len() >= self.capacity {
            match self.mode {
                ReplayMode::Uniform => self.records.pop_front(),
                ReplayMode::Prioritized { .. } => self
                    .lowest_priority_index()
                    .and_then(|idx| self.records.remove(idx)),
            }
        } else {
            None
        };
        self.records.push_back(record);
        evicted
    }

    /// Draws `n` records with replacement.
    ///
    /// Returns an empty batch when the memory is empty.
    pub fn sample_batch<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<TransitionRecord> {
        if self.records.is_empty() || n == 0 {
            return Vec::new();
        }

        match self.mode {
            ReplayMode::Uniform => self.sample_uniform(n, rng),
            ReplayMode::Prioritized { alpha } => {
                let weights = self
                    .records
                    .iter()
                    .map(|r| effective_priority(r).powf(alpha));
                match WeightedIndex::<f64>::new(weights) {
                    Ok(dist) => (0..n)
                        .map(|_| self.records[dist.sample(rng)].clone())
                        .collect(),
                    // Weights underflowed or overflowed; fall back to uniform.
                    Err(_) => self.sample_uniform(n, rng),
                }
            }
        }
    }

    fn sample_uniform<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<TransitionRecord> {
        (0..n)
            .map(|_| self.records[rng.gen_range(0..self.records.len())].clone())
            .collect()
    }

    /// O(C) scan. `min_by` keeps the first minimum, i.e. the oldest.
    fn lowest_priority_index(&self) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| effective_priority(a).total_cmp(&effective_priority(b)))
            .map(|(i, _)| i)
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the memory is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    /// Iterates records from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &TransitionRecord> {
        self.records.iter()
    }

    pub fn stats(&self) -> ReplayBufferStats {
        ReplayBufferStats {
            size: self.records.len(),
            capacity: self.capacity,
            utilization_percent: self.records.len() as f64 / self.capacity as f64 * 100.0,
        }
    }
}

fn effective_priority(record: &TransitionRecord) -> f64 {
    match record.priority {
        None => DEFAULT_PRIORITY,
        Some(p) if p.is_finite() && p > 0.0 => p,
        Some(_) => MIN_PRIORITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::{Arc, Mutex};

    /// Record tagged by its reward so tests can identify it.
    fn tagged(tag: f64) -> TransitionRecord {
        TransitionRecord::new(vec![0.0; 2], 0, tag, vec![0.0; 2])
    }

    fn rewards(memory: &ReplayMemory) -> Vec<f64> {
        memory.iter().map(|r| r.reward).collect()
    }

    #[test]
    fn zero_capacity_is_a_configuration_error() {
        let err = ReplayMemory::new(0, ReplayMode::Uniform).unwrap_err();
        assert!(matches!(err, CoordinatorError::Configuration(_)));
    }

    #[test]
    fn non_positive_alpha_is_rejected() {
        assert!(ReplayMemory::new(4, ReplayMode::Prioritized { alpha: 0.0 }).is_err());
        assert!(ReplayMemory::new(4, ReplayMode::Prioritized { alpha: f64::NAN }).is_err());
    }

    #[test]
    fn uniform_mode_keeps_newest_three() {
        let mut memory = ReplayMemory::new(3, ReplayMode::Uniform).unwrap();
        for tag in 1..=5 {
            memory.push(tagged(tag as f64));
        }
        assert_eq!(rewards(&memory), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn push_evicts_at_most_one_and_never_exceeds_capacity() {
        let mut rng = StdRng::seed_from_u64(7);
        for mode in [ReplayMode::Uniform, ReplayMode::Prioritized { alpha: 0.6 }] {
            let mut memory = ReplayMemory::new(5, mode).unwrap();
            for i in 0..50 {
                let before = memory.len();
                let evicted = memory.push(tagged(i as f64).with_priority(rng.gen::<f64>()));
                assert!(memory.len() <= memory.capacity());
                if before == 5 {
                    assert!(evicted.is_some());
                    assert_eq!(memory.len(), 5);
                } else {
                    assert!(evicted.is_none());
                    assert_eq!(memory.len(), before + 1);
                }
            }
        }
    }

    #[test]
    fn prioritized_mode_evicts_lowest_priority() {
        let mut memory = ReplayMemory::new(3, ReplayMode::Prioritized { alpha: 1.0 }).unwrap();
        memory.push(tagged(1.0).with_priority(0.8));
        memory.push(tagged(2.0).with_priority(0.2));
        memory.push(tagged(3.0).with_priority(0.5));
        let evicted = memory.push(tagged(4.0).with_priority(0.9)).unwrap();
        assert_eq!(evicted.reward, 2.0);
        assert_eq!(rewards(&memory), vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn low_priority_push_into_full_memory_is_held() {
        let mut memory = ReplayMemory::new(3, ReplayMode::Prioritized { alpha: 1.0 }).unwrap();
        memory.push(tagged(1.0).with_priority(0.8));
        memory.push(tagged(2.0).with_priority(0.5));
        memory.push(tagged(3.0).with_priority(0.9));
        let evicted = memory.push(tagged(4.0).with_priority(0.1)).unwrap();
        assert_eq!(evicted.reward, 2.0);
        assert_eq!(rewards(&memory), vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn terminal_records_survive_eviction_round() {
        let mut memory = ReplayMemory::new(1, ReplayMode::Uniform).unwrap();
        memory.push(tagged(1.0));
        memory.push(tagged(2.0).terminal());
        let held: Vec<_> = memory.iter().map(|r| (r.reward, r.done)).collect();
        assert_eq!(held, vec![(2.0, true)]);
    }

    #[test]
    fn prioritized_ties_evict_oldest() {
        let mut memory = ReplayMemory::new(2, ReplayMode::Prioritized { alpha: 1.0 }).unwrap();
        memory.push(tagged(1.0).with_priority(0.5));
        memory.push(tagged(2.0).with_priority(0.5));
        let evicted = memory.push(tagged(3.0).with_priority(0.5)).unwrap();
        assert_eq!(evicted.reward, 1.0);
    }

    #[test]
    fn sample_from_empty_memory_is_empty() {
        let memory = ReplayMemory::new(3, ReplayMode::Uniform).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(memory.sample_batch(8, &mut rng).is_empty());
    }

    #[test]
    fn uniform_sample_returns_requested_count() {
        let mut memory = ReplayMemory::new(10, ReplayMode::Uniform).unwrap();
        for tag in 0..4 {
            memory.push(tagged(tag as f64));
        }
        let mut rng = StdRng::seed_from_u64(1);
        let batch = memory.sample_batch(16, &mut rng);
        assert_eq!(batch.len(), 16);
        assert!(batch.iter().all(|r| (0.0..4.0).contains(&r.reward)));
    }

    #[test]
    fn prioritized_sampling_matches_normalized_weights() {
        let alpha = 0.5;
        let priorities = [1.0, 2.0, 4.0, 9.0];
        let mut memory = ReplayMemory::new(4, ReplayMode::Prioritized { alpha }).unwrap();
        for (i, p) in priorities.iter().enumerate() {
            memory.push(tagged(i as f64).with_priority(*p));
        }

        let mut rng = StdRng::seed_from_u64(2024);
        let n = 200_000;
        let mut counts = [0usize; 4];
        for record in memory.sample_batch(n, &mut rng) {
            counts[record.reward as usize] += 1;
        }

        // sqrt weights: 1, 1.414, 2, 3
        let total: f64 = priorities.iter().map(|p: &f64| p.powf(alpha)).sum();
        for (i, p) in priorities.iter().enumerate() {
            let expected = p.powf(alpha) / total;
            let observed = counts[i] as f64 / n as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "entry {}: observed {:.4}, expected {:.4}",
                i,
                observed,
                expected
            );
        }
    }

    #[test]
    fn concurrent_pushes_respect_capacity_and_lose_nothing() {
        let memory = Arc::new(Mutex::new(ReplayMemory::new(64, ReplayMode::Uniform).unwrap()));
        let evictions = Arc::new(Mutex::new(0usize));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let memory = Arc::clone(&memory);
                let evictions = Arc::clone(&evictions);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let evicted = memory.lock().unwrap().push(tagged((t * 1000 + i) as f64));
                        if evicted.is_some() {
                            *evictions.lock().unwrap() += 1;
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let memory = memory.lock().unwrap();
        assert_eq!(memory.len(), 64);
        // every push either inserted or evicted-then-inserted
        assert_eq!(*evictions.lock().unwrap() + memory.len(), 800);
    }

    #[test]
    fn stats_report_utilization() {
        let mut memory = ReplayMemory::new(4, ReplayMode::Uniform).unwrap();
        memory.push(tagged(1.0));
        let stats = memory.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 4);
        assert!((stats.utilization_percent - 25.0).abs() < 1e-10);

        memory.clear();
        assert!(memory.is_empty());
    }
}
