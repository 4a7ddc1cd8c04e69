//! Adaptive sample sizing.
//!
//! The planner is a monotonic staircase over the estimated document count,
//! always capped by the configured maximum:
//!
//! | estimated count        | requested sample       |
//! |------------------------|------------------------|
//! | `< 50_000`             | `min(count, cap)`      |
//! | `50_000..200_000`      | `min(50_000, cap)`     |
//! | `>= 200_000`           | `min(75_000, cap)`     |

/// Default cap on documents sampled per collection.
pub const DEFAULT_MAX_DOCS: u64 = 75_000;

/// Collections below this count are read in full.
pub const FULL_SCAN_LIMIT: u64 = 50_000;

/// Collections below this count (and at or above [`FULL_SCAN_LIMIT`]) get the medium sample.
pub const LARGE_COLLECTION_LIMIT: u64 = 200_000;

pub const MEDIUM_SAMPLE_SIZE: u64 = 50_000;
pub const LARGE_SAMPLE_SIZE: u64 = 75_000;

/// Decide how many documents to request from a collection.
///
/// A `max_docs` of zero falls back to [`DEFAULT_MAX_DOCS`].
pub fn plan_sample_size(estimated_count: u64, max_docs: u64) -> u64 {
    let cap = if max_docs == 0 {
        DEFAULT_MAX_DOCS
    } else {
        max_docs
    };

    let target = if estimated_count < FULL_SCAN_LIMIT {
        estimated_count
    } else if estimated_count < LARGE_COLLECTION_LIMIT {
        MEDIUM_SAMPLE_SIZE
    } else {
        LARGE_SAMPLE_SIZE
    };

    target.min(cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tier_boundaries() {
        let cap = DEFAULT_MAX_DOCS;
        assert_eq!(plan_sample_size(49_999, cap), 49_999);
        assert_eq!(plan_sample_size(50_000, cap), 50_000);
        assert_eq!(plan_sample_size(199_999, cap), 50_000);
        assert_eq!(plan_sample_size(200_000, cap), 75_000);
        assert_eq!(plan_sample_size(10_000_000, cap), 75_000);
    }

    #[test]
    fn test_cap_applies_to_every_tier() {
        assert_eq!(plan_sample_size(49_999, 1_000), 1_000);
        assert_eq!(plan_sample_size(50_000, 1_000), 1_000);
        assert_eq!(plan_sample_size(200_000, 60_000), 60_000);
        assert_eq!(plan_sample_size(120, 1_000), 120);
    }

    #[test]
    fn test_zero_cap_uses_default() {
        assert_eq!(plan_sample_size(300_000, 0), DEFAULT_MAX_DOCS);
        assert_eq!(plan_sample_size(0, 0), 0);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_count_tier_or_cap(count in 0u64..1_000_000, cap in 1u64..200_000) {
            let size = plan_sample_size(count, cap);
            prop_assert!(size <= cap);
            prop_assert!(size <= LARGE_SAMPLE_SIZE);
            if count < FULL_SCAN_LIMIT {
                prop_assert!(size <= count);
            }
        }

        #[test]
        fn prop_monotonic_in_count(count in 0u64..1_000_000, delta in 0u64..100_000, cap in 1u64..200_000) {
            prop_assert!(plan_sample_size(count, cap) <= plan_sample_size(count + delta, cap));
        }
    }
}
