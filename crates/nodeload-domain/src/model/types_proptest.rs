//! Property-based tests for lookup keys.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::model::{CompositeKey, LookupKey};

    proptest! {
        #[test]
        fn test_numeric_text_and_number_normalize_identically(id in 1u64..u64::MAX, zeros in 0usize..4) {
            let padded = format!("{}{}", "0".repeat(zeros), id);
            prop_assert_eq!(LookupKey::from(padded.as_str()).normalized(), LookupKey::Number(id).normalized());
            prop_assert_eq!(LookupKey::from(padded.as_str()).as_id(), Some(id));
        }

        #[test]
        fn test_normalization_is_idempotent(s in "[ a-z0-9_-]{0,24}") {
            let once = LookupKey::from(s.as_str()).normalized();
            prop_assert_eq!(once.normalized(), once);
        }

        #[test]
        fn test_external_ids_keep_their_text(id in 1u64..u64::MAX, zeros in 1usize..4) {
            let padded = format!("{}{}", "0".repeat(zeros), id);
            let external = LookupKey::from(padded.as_str()).normalized_external();
            prop_assert_eq!(external.as_external_id(), Some(padded));
            prop_assert_ne!(external, LookupKey::Number(id).normalized_external());
        }

        #[test]
        fn test_non_numeric_text_never_yields_an_id(s in "[a-z_-][a-z0-9_-]{0,20}") {
            prop_assert_eq!(LookupKey::from(s.as_str()).as_id(), None);
        }

        #[test]
        fn test_composite_field_order_does_not_matter(a in 1u64..1_000_000, u in 1u64..1_000_000) {
            let forward = LookupKey::composite([("assignment_id", a), ("user_id", u)]);
            let reverse = LookupKey::composite([("user_id", u.to_string()), ("assignment_id", a.to_string())]);
            prop_assert_eq!(forward.normalized(), reverse.normalized());
            prop_assert_eq!(
                CompositeKey::assignment_and_user(&forward),
                CompositeKey::assignment_and_user(&reverse)
            );
        }
    }
}
