//! Identifier registry and collision reconciliation.
//!
//! Generated batches routinely repeat identifiers, both within a batch and
//! across batches. [`IdRegistry`] tracks every identifier finalized in the
//! current run and substitutes a fallback numeral whenever a candidate has
//! already been used, so identifiers in the output are pairwise distinct.

use std::collections::HashSet;

use thiserror::Error;
use tracing::warn;

/// Default first value probed for fallback identifiers.
pub const DEFAULT_FALLBACK_START: u64 = 10_000;

/// Largest identifier that still fits the five-digit field.
pub const FIVE_DIGIT_MAX: u64 = 99_999;

/// Outcome of reconciling one candidate identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// Identifier to write.
    pub id: String,
    /// Original candidate when a fallback was substituted.
    pub reassigned_from: Option<String>,
}

impl Reconciled {
    /// Whether the candidate collided and was replaced.
    pub fn was_reassigned(&self) -> bool {
        self.reassigned_from.is_some()
    }
}

/// The fallback cursor ran past `u64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fallback identifier space exhausted (cursor at {cursor})")]
pub struct IdSpaceExhausted {
    pub cursor: u64,
}

/// Set of finalized identifiers plus the fallback cursor.
///
/// The cursor advances by one after every accepted record, fresh or not,
/// so it roughly tracks how many identifiers have been issued. On a
/// collision it probes upward for the first unused numeral and ends one
/// past the value issued.
#[derive(Debug, Clone)]
pub struct IdRegistry {
    used: HashSet<String>,
    cursor: u64,
    warned_wide: bool,
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_START)
    }
}

impl IdRegistry {
    /// Creates an empty registry whose fallback cursor starts at `fallback_start`.
    pub fn new(fallback_start: u64) -> Self {
        Self {
            used: HashSet::new(),
            cursor: fallback_start,
            warned_wide: false,
        }
    }

    /// Decides the identifier to finalize for `candidate` and registers it.
    ///
    /// # Errors
    ///
    /// Returns [`IdSpaceExhausted`] if the cursor would overflow `u64`. Nothing
    /// is registered in that case.
    pub fn reconcile(&mut self, candidate: &str) -> Result<Reconciled, IdSpaceExhausted> {
        let reconciled = if self.used.contains(candidate) {
            let mut fallback = self.cursor.to_string();
            while self.used.contains(&fallback) {
                self.cursor = self.advance()?;
                fallback = self.cursor.to_string();
            }
            if self.cursor > FIVE_DIGIT_MAX && !self.warned_wide {
                self.warned_wide = true;
                warn!(
                    cursor = self.cursor,
                    "Fallback identifiers exceed five digits; issuing wider ids"
                );
            }
            Reconciled {
                id: fallback,
                reassigned_from: Some(candidate.to_string()),
            }
        } else {
            Reconciled {
                id: candidate.to_string(),
                reassigned_from: None,
            }
        };

        let next = self.advance()?;
        self.used.insert(reconciled.id.clone());
        self.cursor = next;
        Ok(reconciled)
    }

    fn advance(&self) -> Result<u64, IdSpaceExhausted> {
        self.cursor
            .checked_add(1)
            .ok_or(IdSpaceExhausted { cursor: self.cursor })
    }

    /// Whether `id` has already been finalized.
    pub fn contains(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// Number of identifiers finalized so far.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Whether no identifier has been finalized yet.
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Next value the fallback probe will start from.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_candidate_is_kept() {
        let mut registry = IdRegistry::new(10_000);
        let result = registry.reconcile("12345").expect("id space");

        assert_eq!(result.id, "12345");
        assert!(!result.was_reassigned());
        assert!(registry.contains("12345"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.cursor(), 10_001);
    }

    #[test]
    fn test_collision_takes_first_unused_from_cursor() {
        let mut registry = IdRegistry::new(10_000);
        registry.reconcile("12345").expect("id space");
        // cursor is now 10_001 after the fresh accept
        let result = registry.reconcile("12345").expect("id space");

        assert_eq!(result.id, "10001");
        assert_eq!(result.reassigned_from.as_deref(), Some("12345"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.cursor(), 10_002);
    }

    #[test]
    fn test_collision_with_unadvanced_cursor_uses_start_value() {
        let mut registry = IdRegistry::new(10_000);
        registry.used.insert("12345".to_string());

        let result = registry.reconcile("12345").expect("id space");
        assert_eq!(result.id, "10000");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.cursor(), 10_001);
    }

    #[test]
    fn test_collision_probes_past_used_values() {
        let mut registry = IdRegistry::new(10_000);
        registry.used.insert("10000".to_string());
        registry.used.insert("10001".to_string());
        registry.used.insert("20000".to_string());

        let result = registry.reconcile("20000").expect("id space");
        assert_eq!(result.id, "10002");
        assert_eq!(registry.cursor(), 10_003);
    }

    #[test]
    fn test_repeated_collisions_yield_distinct_ids() {
        let mut registry = IdRegistry::new(10_000);
        registry.reconcile("55555").expect("id space");

        let first = registry.reconcile("55555").expect("id space");
        let second = registry.reconcile("55555").expect("id space");

        assert_ne!(first.id, second.id);
        assert_ne!(first.id, "55555");
        assert_ne!(second.id, "55555");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_model_repeating_a_fallback_value_is_caught() {
        let mut registry = IdRegistry::new(10_000);
        registry.reconcile("12345").expect("id space");
        let fallback = registry.reconcile("12345").expect("id space");
        assert_eq!(fallback.id, "10001");

        let result = registry.reconcile("10001").expect("id space");
        assert!(result.was_reassigned());
        assert_ne!(result.id, "10001");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_all_ids_unique_under_heavy_duplication() {
        let mut registry = IdRegistry::new(10_000);
        let mut issued = HashSet::new();
        let candidates = ["10000", "10001", "10002", "10000", "10003", "10001", "10004"];

        for round in 0..50 {
            for candidate in candidates {
                let result = registry.reconcile(candidate).expect("id space");
                assert!(issued.insert(result.id), "duplicate id in round {round}");
            }
        }
        assert_eq!(registry.len(), 350);
    }

    #[test]
    fn test_fallbacks_widen_past_five_digits() {
        let mut registry = IdRegistry::new(FIVE_DIGIT_MAX);
        registry.reconcile("12345").expect("id space");
        let result = registry.reconcile("12345").expect("id space");

        assert_eq!(result.id, "100000");
        assert!(registry.warned_wide);
    }

    #[test]
    fn test_cursor_overflow_is_an_error() {
        let mut registry = IdRegistry::new(u64::MAX);
        let err = registry.reconcile("12345").expect_err("cursor cannot advance");

        assert_eq!(err.cursor, u64::MAX);
        assert!(registry.is_empty());
        assert_eq!(registry.cursor(), u64::MAX);
    }

    #[test]
    fn test_last_representable_fallback_is_issued() {
        let mut registry = IdRegistry::new(u64::MAX - 2);
        registry.reconcile("12345").expect("fresh id");
        let result = registry.reconcile("12345").expect("one value left");

        assert_eq!(result.id, (u64::MAX - 1).to_string());
        assert_eq!(registry.cursor(), u64::MAX);
        assert!(registry.reconcile("12345").is_err());
    }
}
