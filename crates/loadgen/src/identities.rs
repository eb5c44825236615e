//! Shared registry of virtual-user identities.
//!
//! Every virtual user registers its identity here at session start, and the
//! transfer executor samples recipients from it. Identities are never
//! removed, so the pool only grows over the course of a run.

use parking_lot::Mutex;
use rand::Rng;
use tracing::trace;

/// Pool contents, guarded as a unit so allocation and sampling serialize.
#[derive(Debug, Default)]
struct PoolInner {
    /// Registered identities.
    identities: Vec<String>,

    /// Number of identities handed out by [`IdentityPool::allocate`].
    counter: u64,
}

/// Thread-safe registry of known user identities.
///
/// Shared by reference (`Arc<IdentityPool>`) with every user task. The lock
/// is never held across an `.await`.
#[derive(Debug)]
pub struct IdentityPool {
    inner: Mutex<PoolInner>,

    /// Prefix for allocated identity names.
    prefix: String,
}

impl IdentityPool {
    /// Create an empty pool that names new users `<prefix><n>`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(PoolInner::default()),
            prefix: prefix.into(),
        }
    }

    /// Register an identity, making it visible to all subsequent samples.
    pub fn register(&self, identity: impl Into<String>) {
        let identity = identity.into();
        trace!(%identity, "Registering identity");
        self.inner.lock().identities.push(identity);
    }

    /// Allocate a fresh identity and register it in one critical section.
    ///
    /// Numbering starts at 1.
    pub fn allocate(&self) -> String {
        let mut inner = self.inner.lock();
        inner.counter += 1;
        let identity = format!("{}{}", self.prefix, inner.counter);
        inner.identities.push(identity.clone());
        identity
    }

    /// Pick a uniformly random identity other than `exclude`.
    ///
    /// Returns `None` when fewer than two identities are registered.
    pub fn sample_excluding<R: Rng + ?Sized>(&self, exclude: &str, rng: &mut R) -> Option<String> {
        let inner = self.inner.lock();
        if inner.identities.len() < 2 {
            return None;
        }

        let candidates = inner.identities.iter().filter(|id| *id != exclude).count();
        if candidates == 0 {
            return None;
        }

        let pick = rng.gen_range(0..candidates);
        inner
            .identities
            .iter()
            .filter(|id| *id != exclude)
            .nth(pick)
            .cloned()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.inner.lock().identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check whether an identity has been registered.
    pub fn contains(&self, identity: &str) -> bool {
        self.inner.lock().identities.iter().any(|id| id == identity)
    }
}

impl Default for IdentityPool {
    fn default() -> Self {
        Self::new("user")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_allocate_numbers_from_one() {
        let pool = IdentityPool::new("user");
        assert_eq!(pool.allocate(), "user1");
        assert_eq!(pool.allocate(), "user2");
        assert_eq!(pool.len(), 2);
        assert!(pool.contains("user1"));
    }

    #[test]
    fn test_sample_requires_two_identities() {
        let pool = IdentityPool::default();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(pool.sample_excluding("user1", &mut rng).is_none());

        pool.register("user1");
        assert!(pool.sample_excluding("user1", &mut rng).is_none());
        // Even a stranger cannot sample from a single-entry pool
        assert!(pool.sample_excluding("nobody", &mut rng).is_none());

        pool.register("user2");
        assert_eq!(
            pool.sample_excluding("user1", &mut rng).as_deref(),
            Some("user2")
        );
    }

    #[test]
    fn test_sample_is_roughly_uniform() {
        let pool = IdentityPool::default();
        for _ in 0..4 {
            pool.allocate();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut seen = std::collections::HashMap::new();

        for _ in 0..3000 {
            let pick = pool.sample_excluding("user1", &mut rng).unwrap();
            *seen.entry(pick).or_insert(0u32) += 1;
        }

        assert!(!seen.contains_key("user1"));
        assert_eq!(seen.len(), 3);
        for count in seen.values() {
            assert!((800..1200).contains(count), "skewed sample: {:?}", seen);
        }
    }

    #[test]
    fn test_concurrent_register_and_sample() {
        let pool = Arc::new(IdentityPool::new("u"));
        let threads = 8;
        let per_thread = 200;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut rng = ChaCha8Rng::seed_from_u64(t);
                    let mut mine = Vec::new();
                    for _ in 0..per_thread {
                        let me = pool.allocate();
                        if let Some(other) = pool.sample_excluding(&me, &mut rng) {
                            assert_ne!(other, me);
                        }
                        mine.push(me);
                    }
                    mine
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "identity allocated twice");
            }
        }

        assert_eq!(all.len(), (threads * per_thread) as usize);
        assert_eq!(pool.len(), all.len());
        for id in &all {
            assert!(pool.contains(id), "lost identity {}", id);
        }
    }
}
