// src/cache.rs
//! Compiled circuits and keys, keyed by what determines their shape.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use ark_groth16::VerifyingKey;
use ark_serialize::CanonicalSerialize;
use parking_lot::Mutex;
use tracing::debug;

use crate::config::VkModeKind;
use crate::curves::InnerCurve;
use crate::error::Result;
use crate::recursion::CompiledRecursion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CircuitFingerprint {
    /// blake3 of the compressed inner key; absent when the key is a witness.
    pub vk_digest: Option<[u8; 32]>,
    pub n_public: usize,
    pub mode: VkModeKind,
}

impl CircuitFingerprint {
    pub fn new(mode: VkModeKind, vk: &VerifyingKey<InnerCurve>, n_public: usize) -> Result<Self> {
        let vk_digest = match mode {
            VkModeKind::Fixed => {
                let mut bytes = Vec::new();
                vk.serialize_compressed(&mut bytes)?;
                Some(*blake3::hash(&bytes).as_bytes())
            }
            VkModeKind::Dynamic => None,
        };
        Ok(Self { vk_digest, n_public, mode })
    }
}

struct Lru<V> {
    entries: HashMap<CircuitFingerprint, Arc<V>>,
    // least recently used first
    order: VecDeque<CircuitFingerprint>,
}

impl<V> Lru<V> {
    fn touch(&mut self, key: &CircuitFingerprint) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(*key);
    }
}

/// Bounded least-recently-used cache, by default of [`CompiledRecursion`]s.
pub struct CircuitCache<V = CompiledRecursion> {
    capacity: usize,
    inner: Mutex<Lru<V>>,
}

impl<V> CircuitCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Lru { entries: HashMap::new(), order: VecDeque::new() }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &CircuitFingerprint) -> Option<Arc<V>> {
        let mut lru = self.inner.lock();
        let hit = lru.entries.get(key).cloned();
        if hit.is_some() {
            lru.touch(key);
        }
        hit
    }

    /// Return the entry for `key`, building it with `build` on a miss.
    ///
    /// The lock is held while building, so concurrent callers never build
    /// the same circuit twice. A failed build leaves the cache unchanged.
    pub fn get_or_try_insert_with<F>(&self, key: CircuitFingerprint, build: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        let mut lru = self.inner.lock();
        if let Some(hit) = lru.entries.get(&key).cloned() {
            debug!(?key, "circuit cache hit");
            lru.touch(&key);
            return Ok(hit);
        }

        debug!(?key, "circuit cache miss");
        let compiled = Arc::new(build()?);
        while lru.entries.len() >= self.capacity {
            let Some(oldest) = lru.order.pop_front() else { break };
            lru.entries.remove(&oldest);
            debug!(key = ?oldest, "circuit cache eviction");
        }
        lru.entries.insert(key, Arc::clone(&compiled));
        lru.touch(&key);
        Ok(compiled)
    }
}
