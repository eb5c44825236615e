//! Weighted task selection and think-time pacing.
//!
//! Each virtual user owns one [`TaskScheduler`]. Picks are independent per
//! user and per iteration: the scheduler has no memory beyond its RNG
//! stream, which is derived from the run seed and the user id so that a
//! fixed seed reproduces the same sequence of tasks and pauses.

use crate::config::{TaskWeights, ThinkTime};
use rand::distributions::{Distribution, Uniform, WeightedError, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::time::Duration;

/// A schedulable unit of work.
///
/// Tasks are distinct identities: `TransferThenPurchase` has its own weight
/// on top of the standalone `Transfer` and `Purchase` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Purchase,
    Transfer,
    TransferThenPurchase,
    CheckBalance,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Task::Purchase => "purchase",
            Task::Transfer => "transfer",
            Task::TransferThenPurchase => "transfer-then-purchase",
            Task::CheckBalance => "check-balance",
        };
        f.write_str(name)
    }
}

/// Per-user task picker.
#[derive(Clone)]
pub struct TaskScheduler {
    /// Tasks with a non-zero weight, aligned with `distribution`.
    tasks: Vec<Task>,

    distribution: WeightedIndex<u32>,

    /// Think-time range in microseconds.
    pause: Uniform<u64>,

    rng: ChaCha8Rng,
}

impl TaskScheduler {
    /// Build a scheduler with an explicit RNG seed.
    pub fn new(
        weights: &TaskWeights,
        think_time: ThinkTime,
        seed: u64,
    ) -> Result<Self, WeightedError> {
        let table = [
            (Task::Purchase, weights.purchase),
            (Task::Transfer, weights.transfer),
            (Task::TransferThenPurchase, weights.transfer_then_purchase),
            (Task::CheckBalance, weights.check_balance),
        ];

        let (tasks, task_weights): (Vec<Task>, Vec<u32>) =
            table.into_iter().filter(|(_, w)| *w > 0).unzip();

        if tasks.is_empty() {
            return Err(WeightedError::AllWeightsZero);
        }

        let distribution = WeightedIndex::new(task_weights)?;

        let pause = Uniform::new_inclusive(
            think_time.min_us,
            think_time.max_us.max(think_time.min_us),
        );

        Ok(Self {
            tasks,
            distribution,
            pause,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Build the scheduler for one user of a run.
    pub fn for_user(
        weights: &TaskWeights,
        think_time: ThinkTime,
        run_seed: u64,
        user_id: u64,
    ) -> Result<Self, WeightedError> {
        Self::new(weights, think_time, user_seed(run_seed, user_id))
    }

    /// Copy of this scheduler with a fresh RNG stream.
    pub fn reseed(&self, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            ..self.clone()
        }
    }

    /// Pick the next task.
    pub fn next_task(&mut self) -> Task {
        self.tasks[self.distribution.sample(&mut self.rng)]
    }

    /// Draw the pause before the next task.
    pub fn think_time(&mut self) -> Duration {
        Duration::from_micros(self.pause.sample(&mut self.rng))
    }

    /// The scheduler's RNG, shared with executors for recipient and item
    /// picks so the whole user stream stays reproducible.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// Derive a user's RNG seed from the run seed.
///
/// SplitMix64 finalizer, so neighbouring user ids get unrelated streams.
pub fn user_seed(run_seed: u64, user_id: u64) -> u64 {
    let mut z = run_seed ^ user_id.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn scheduler(seed: u64) -> TaskScheduler {
        TaskScheduler::new(&TaskWeights::default(), ThinkTime::default(), seed).unwrap()
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = scheduler(99);
        let mut b = scheduler(99);

        for _ in 0..100 {
            assert_eq!(a.think_time(), b.think_time());
            assert_eq!(a.next_task(), b.next_task());
        }
    }

    #[test]
    fn test_reseed_matches_fresh_scheduler() {
        let template = scheduler(1);
        let mut a = template.reseed(user_seed(5, 3));
        let mut b = TaskScheduler::for_user(&TaskWeights::default(), ThinkTime::default(), 5, 3)
            .unwrap();

        for _ in 0..20 {
            assert_eq!(a.next_task(), b.next_task());
        }
    }

    #[test]
    fn test_users_get_different_streams() {
        let weights = TaskWeights::default();
        let mut a = TaskScheduler::for_user(&weights, ThinkTime::default(), 1, 1).unwrap();
        let mut b = TaskScheduler::for_user(&weights, ThinkTime::default(), 1, 2).unwrap();

        let seq_a: Vec<_> = (0..50).map(|_| a.next_task()).collect();
        let seq_b: Vec<_> = (0..50).map(|_| b.next_task()).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn test_weight_proportions() {
        let mut s = scheduler(7);
        let mut counts: HashMap<Task, u32> = HashMap::new();
        let draws = 16_000;

        for _ in 0..draws {
            *counts.entry(s.next_task()).or_default() += 1;
        }

        // Expected 8000 / 5000 / 2000 / 1000 out of 16000
        let expect = [
            (Task::Purchase, 8000),
            (Task::Transfer, 5000),
            (Task::TransferThenPurchase, 2000),
            (Task::CheckBalance, 1000),
        ];
        for (task, expected) in expect {
            let got = counts[&task] as i64;
            assert!(
                (got - expected).abs() < expected / 10,
                "{} drawn {} times, expected ~{}",
                task,
                got,
                expected
            );
        }
    }

    #[test]
    fn test_zero_weight_disables_task() {
        let mut s = TaskScheduler::new(
            &TaskWeights::check_balance_only(),
            ThinkTime::default(),
            3,
        )
        .unwrap();

        for _ in 0..100 {
            assert_eq!(s.next_task(), Task::CheckBalance);
        }
    }

    #[test]
    fn test_all_zero_rejected() {
        let weights = TaskWeights {
            purchase: 0,
            transfer: 0,
            transfer_then_purchase: 0,
            check_balance: 0,
        };
        assert!(matches!(
            TaskScheduler::new(&weights, ThinkTime::default(), 0),
            Err(WeightedError::AllWeightsZero)
        ));
    }

    #[test]
    fn test_think_time_within_bounds() {
        let bounds = ThinkTime::new(Duration::from_millis(2), Duration::from_millis(4));
        let mut s = TaskScheduler::new(&TaskWeights::default(), bounds, 5).unwrap();

        for _ in 0..1000 {
            let pause = s.think_time();
            assert!(pause >= Duration::from_millis(2) && pause <= Duration::from_millis(4));
        }
    }

    #[test]
    fn test_sub_millisecond_and_saturated_bounds() {
        let bounds = ThinkTime::new(Duration::from_micros(100), Duration::from_micros(300));
        let mut s = TaskScheduler::new(&TaskWeights::default(), bounds, 5).unwrap();
        for _ in 0..1000 {
            let pause = s.think_time();
            assert!(pause >= Duration::from_micros(100) && pause <= Duration::from_micros(300));
        }

        let unbounded = ThinkTime::new(Duration::from_secs(1), Duration::MAX);
        let mut s = TaskScheduler::new(&TaskWeights::default(), unbounded, 5).unwrap();
        assert!(s.think_time() >= Duration::from_secs(1));
    }

    #[test]
    fn test_zero_think_time() {
        let bounds = ThinkTime::new(Duration::ZERO, Duration::ZERO);
        let mut s = TaskScheduler::new(&TaskWeights::default(), bounds, 5).unwrap();
        assert_eq!(s.think_time(), Duration::ZERO);
    }
}
