//! Selection of the snapshots that belong to one instance's job lineage.

use snap_provider::{ImageType, Snapshot};

use crate::naming::NamingScheme;

/// Job-created snapshots of `instance_id`, oldest first.
///
/// Keeps only `snapshot` images taken from `instance_id` whose description
/// follows the naming scheme. Snapshots sharing a creation timestamp keep
/// their catalog order.
pub fn select_valid(catalog: &[Snapshot], instance_id: u64, naming: &NamingScheme) -> Vec<Snapshot> {
    let mut valid: Vec<Snapshot> = catalog
        .iter()
        .filter(|snapshot| snapshot.image_type == ImageType::Snapshot)
        .filter(|snapshot| snapshot.created_from == Some(instance_id))
        .filter(|snapshot| naming.matches(&snapshot.description))
        .cloned()
        .collect();

    // sort_by_key is stable
    valid.sort_by_key(|snapshot| snapshot.created);
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn snapshot(id: u64, from: Option<u64>, kind: ImageType, description: &str, day: u32) -> Snapshot {
        Snapshot {
            id,
            description: description.to_string(),
            image_type: kind,
            created_from: from,
            created: Utc.with_ymd_and_hms(2024, 3, day, 3, 0, 0).unwrap(),
        }
    }

    fn auto(instance: u64, day: u32) -> String {
        format!("auto-65f1c2a3b4d5e-{instance}-{day:02}-03-2024_03-00-00")
    }

    #[test]
    fn test_discards_foreign_images_and_sorts() {
        let catalog = vec![
            snapshot(1, Some(10), ImageType::Snapshot, &auto(10, 5), 5),
            snapshot(2, Some(10), ImageType::Backup, &auto(10, 1), 1),
            snapshot(3, Some(11), ImageType::Snapshot, &auto(11, 2), 2),
            snapshot(4, Some(10), ImageType::Snapshot, "before upgrade", 3),
            snapshot(5, None, ImageType::Snapshot, &auto(10, 4), 4),
            snapshot(6, Some(10), ImageType::Snapshot, &auto(10, 2), 2),
            snapshot(7, Some(10), ImageType::Other("app".into()), &auto(10, 6), 6),
        ];

        let valid = select_valid(&catalog, 10, &NamingScheme::new());
        let ids: Vec<u64> = valid.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![6, 1]);

        for s in &valid {
            assert_eq!(s.image_type, ImageType::Snapshot);
            assert_eq!(s.created_from, Some(10));
        }
    }

    #[test]
    fn test_identical_timestamps_are_all_kept_in_catalog_order() {
        let catalog = vec![
            snapshot(30, Some(10), ImageType::Snapshot, &auto(10, 9), 9),
            snapshot(10, Some(10), ImageType::Snapshot, &auto(10, 9), 9),
            snapshot(20, Some(10), ImageType::Snapshot, &auto(10, 8), 8),
        ];

        let valid = select_valid(&catalog, 10, &NamingScheme::new());
        let ids: Vec<u64> = valid.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![20, 30, 10]);
    }

    #[test]
    fn test_empty_catalog() {
        assert!(select_valid(&[], 10, &NamingScheme::new()).is_empty());
    }

    #[test]
    fn test_catalog_is_untouched() {
        let catalog = vec![
            snapshot(2, Some(10), ImageType::Snapshot, &auto(10, 2), 2),
            snapshot(1, Some(10), ImageType::Snapshot, &auto(10, 1), 1),
        ];
        let before = catalog.clone();
        let _ = select_valid(&catalog, 10, &NamingScheme::new());
        assert_eq!(catalog, before);
    }
}
