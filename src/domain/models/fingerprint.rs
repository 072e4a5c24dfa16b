//! Structural fingerprints and the rolling diversity window.
//!
//! A fingerprint captures the structural shape of one output: how it
//! opens, how long it is, and which linguistic patterns it leans on.
//! The window keeps fingerprints of recently accepted outputs only.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

/// Structural summary of one candidate output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralFingerprint {
    /// Tag classifying the opening pattern (e.g. `direct_address`).
    pub opening_tag: String,
    pub word_count: usize,
    /// Detected linguistic-pattern tags.
    pub pattern_tags: BTreeSet<String>,
    /// Configured shape markers in order of first occurrence, used by the
    /// formulaic-shape predicate.
    pub shape_signature: Vec<String>,
}

/// Bounded FIFO of fingerprints from accepted outputs.
///
/// Pushed exactly once per session that ends in `Passed`; the oldest
/// entry is evicted beyond capacity.
#[derive(Debug, Clone)]
pub struct DiversityWindow {
    capacity: usize,
    entries: VecDeque<StructuralFingerprint>,
}

impl DiversityWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, fingerprint: StructuralFingerprint) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(fingerprint);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The most recent `k` fingerprints, newest last.
    pub fn recent(&self, k: usize) -> impl Iterator<Item = &StructuralFingerprint> {
        let skip = self.entries.len().saturating_sub(k);
        self.entries.iter().skip(skip)
    }

    /// All entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &StructuralFingerprint> {
        self.entries.iter()
    }
}
