//! Retention: which of an instance's snapshots have expired.

/// Entries to delete from an oldest-first sequence so that only the `keep`
/// most recent remain.
pub fn to_delete<T>(ordered: &[T], keep: usize) -> &[T] {
    &ordered[..ordered.len().saturating_sub(keep)]
}

/// An oldest-first sequence split into its expired and retained parts.
#[derive(Debug, PartialEq, Eq)]
pub struct RetentionPlan<'a, T> {
    pub delete: &'a [T],
    pub keep: &'a [T],
}

impl<'a, T> RetentionPlan<'a, T> {
    pub fn new(ordered: &'a [T], keep: usize) -> Self {
        let (delete, keep) = ordered.split_at(to_delete(ordered, keep).len());
        Self { delete, keep }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_most_recent_entries() {
        let ordered = [1, 2, 3, 4, 5];
        assert_eq!(to_delete(&ordered, 3), &[1, 2]);
        assert_eq!(to_delete(&ordered, 1), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_keep_zero_deletes_everything() {
        let ordered = [1, 2, 3];
        assert_eq!(to_delete(&ordered, 0), &[1, 2, 3]);
    }

    #[test]
    fn test_keep_at_least_len_deletes_nothing() {
        let ordered = [1, 2, 3];
        assert!(to_delete(&ordered, 3).is_empty());
        assert!(to_delete(&ordered, 10).is_empty());
        assert!(to_delete::<u8>(&[], 3).is_empty());
    }

    #[test]
    fn test_delete_count_and_ordering_hold_for_all_sizes() {
        for len in 0..12usize {
            let ordered: Vec<usize> = (0..len).collect();
            for keep in 0..14usize {
                let plan = RetentionPlan::new(&ordered, keep);
                assert_eq!(plan.delete.len(), len.saturating_sub(keep));
                assert_eq!(plan.delete.len() + plan.keep.len(), len);
                if let (Some(newest_deleted), Some(oldest_kept)) =
                    (plan.delete.last(), plan.keep.first())
                {
                    assert!(newest_deleted < oldest_kept);
                }
                // Recomputing gives the same answer.
                assert_eq!(to_delete(&ordered, keep), plan.delete);
            }
        }
    }
}
