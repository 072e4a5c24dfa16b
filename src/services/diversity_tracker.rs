//! Diversity tracker.
//!
//! Scores a candidate's structural novelty against the rolling window of
//! recently accepted outputs for its component kind. The window is the
//! only part of evaluation that reads shared mutable state, so the
//! orchestrator computes this dimension last, and only for candidates
//! that have not already failed outright.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::domain::models::{DiversityConfig, DiversityWindow, StructuralFingerprint};

/// Extracts structural fingerprints from candidate text using the
/// configured pattern rules.
#[derive(Debug, Clone)]
pub struct FingerprintExtractor {
    config: DiversityConfig,
}

impl FingerprintExtractor {
    pub fn new(config: DiversityConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, text: &str) -> StructuralFingerprint {
        let lowered = text.trim().to_lowercase();

        let opening_tag = self
            .config
            .opening_patterns
            .iter()
            .find(|rule| rule.needles.iter().any(|n| lowered.starts_with(n.as_str())))
            .map_or_else(
                || {
                    lowered
                        .split_whitespace()
                        .next()
                        .unwrap_or("empty")
                        .to_string()
                },
                |rule| rule.tag.clone(),
            );

        let pattern_tags: BTreeSet<String> = self
            .config
            .linguistic_patterns
            .iter()
            .filter(|rule| rule.needles.iter().any(|n| lowered.contains(n.as_str())))
            .map(|rule| rule.tag.clone())
            .collect();

        // shape markers ordered by first occurrence
        let mut marker_positions: Vec<(usize, String)> = self
            .config
            .shape_markers
            .iter()
            .filter_map(|rule| {
                rule.needles
                    .iter()
                    .filter_map(|n| lowered.find(n.as_str()))
                    .min()
                    .map(|pos| (pos, rule.tag.clone()))
            })
            .collect();
        marker_positions.sort_by_key(|(pos, _)| *pos);

        StructuralFingerprint {
            opening_tag,
            word_count: text.split_whitespace().count(),
            pattern_tags,
            shape_signature: marker_positions.into_iter().map(|(_, tag)| tag).collect(),
        }
    }
}

/// Shared diversity state: one bounded window per component kind.
///
/// Windows for different component kinds never contend; each is guarded
/// by its own mutex, held only for synchronous, CPU-bound work.
pub struct DiversityTracker {
    config: DiversityConfig,
    extractor: FingerprintExtractor,
    windows: RwLock<HashMap<String, Arc<Mutex<DiversityWindow>>>>,
}

impl DiversityTracker {
    pub fn new(config: DiversityConfig) -> Self {
        Self {
            extractor: FingerprintExtractor::new(config.clone()),
            config,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn extract(&self, text: &str) -> StructuralFingerprint {
        self.extractor.extract(text)
    }

    /// Whether the candidate matches the configured formulaic shape
    /// (fixed ordering of content blocks).
    pub fn is_formulaic(&self, fingerprint: &StructuralFingerprint) -> bool {
        !self.config.formulaic_shape.is_empty()
            && fingerprint.shape_signature == self.config.formulaic_shape
    }

    /// Novelty score in [0, 10] for a candidate against one window.
    ///
    /// Starts at 10.0 and deducts configured penalties for a repeated
    /// opening pattern, a word count inside the recent-mean band, a
    /// formulaic shape, and repeated linguistic-pattern tags (capped).
    pub fn score_diversity(
        &self,
        fingerprint: &StructuralFingerprint,
        window: &DiversityWindow,
    ) -> f64 {
        let mut score = 10.0;
        let recent: Vec<&StructuralFingerprint> =
            window.recent(self.config.recent_k).collect();

        let opening_repeats = recent
            .iter()
            .filter(|f| f.opening_tag == fingerprint.opening_tag)
            .count();
        if opening_repeats >= 2 {
            score -= self.config.opening_penalty;
        }

        if !recent.is_empty() {
            let mean = recent.iter().map(|f| f.word_count as f64).sum::<f64>()
                / recent.len() as f64;
            if mean > 0.0 {
                let deviation_pct =
                    ((fingerprint.word_count as f64 - mean).abs() / mean) * 100.0;
                if deviation_pct < self.config.mean_band_pct {
                    score -= self.config.length_penalty;
                }
            }
        }

        if self.is_formulaic(fingerprint) {
            score -= self.config.formulaic_penalty;
        }

        let mut pattern_penalty = 0.0;
        for tag in &fingerprint.pattern_tags {
            let repeats = recent
                .iter()
                .filter(|f| f.pattern_tags.contains(tag))
                .count();
            if repeats >= 2 {
                pattern_penalty += self.config.pattern_penalty;
            }
        }
        score -= pattern_penalty.min(self.config.pattern_penalty_cap);

        score.clamp(0.0, 10.0)
    }

    /// Score a candidate against the window for its component kind, as
    /// the window stood before this session, never self-referential.
    pub fn score_candidate(&self, component_kind: &str, fingerprint: &StructuralFingerprint) -> f64 {
        let window = self.window_for(component_kind);
        let window = window.lock().expect("diversity window poisoned");
        self.score_diversity(fingerprint, &window)
    }

    /// Fold an accepted output's fingerprint into its window. Called
    /// exactly once per session that ends in `Passed`.
    pub fn record_accepted(&self, component_kind: &str, fingerprint: StructuralFingerprint) {
        let window = self.window_for(component_kind);
        let mut window = window.lock().expect("diversity window poisoned");
        window.push(fingerprint);
        debug!(
            component_kind,
            window_len = window.len(),
            "diversity window updated"
        );
    }

    /// Current window length for a component kind.
    pub fn window_len(&self, component_kind: &str) -> usize {
        self.window_for(component_kind)
            .lock()
            .expect("diversity window poisoned")
            .len()
    }

    fn window_for(&self, component_kind: &str) -> Arc<Mutex<DiversityWindow>> {
        if let Some(window) = self
            .windows
            .read()
            .expect("diversity map poisoned")
            .get(component_kind)
        {
            return Arc::clone(window);
        }

        let mut map = self.windows.write().expect("diversity map poisoned");
        Arc::clone(map.entry(component_kind.to_string()).or_insert_with(|| {
            Arc::new(Mutex::new(DiversityWindow::new(self.config.window_capacity)))
        }))
    }
}
