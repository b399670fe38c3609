use indexmap::IndexMap;
use serde::Serialize;

use crate::adapter::DatabaseAdapter;
use crate::collection::{FindOptions, Update};
use crate::errors::{DbError, DbResult, ErrorKind};
use crate::filter::{all, by_id};

/// Controls how [migrate_collections] writes to the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Count the documents that would be copied without writing anything.
    pub dry_run: bool,
    /// Replace documents whose `_id` already exists in the target. When
    /// `false` such documents are counted as skipped.
    pub overwrite_existing: bool,
}

/// Per-collection outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub read: u64,
    pub copied: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub collections: IndexMap<String, CollectionReport>,
}

impl MigrationReport {
    pub fn total_copied(&self) -> u64 {
        self.collections.values().map(|c| c.copied).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.collections.values().map(|c| c.failed).sum()
    }
}

/// Copies every document of the named collections from `source` to
/// `target`, keeping `_id`, `created_at` and `updated_at`.
///
/// Individual document failures are counted and logged; the migration only
/// stops early when a collection cannot be read or either adapter is not
/// connected.
pub fn migrate_collections(
    source: &DatabaseAdapter,
    target: &DatabaseAdapter,
    names: &[&str],
    options: MigrationOptions,
) -> DbResult<MigrationReport> {
    for (role, adapter) in [("source", source), ("target", target)] {
        if !adapter.is_connected() {
            log::error!("Migration {} {} adapter is not connected", role, adapter.kind());
            return Err(DbError::new(
                &format!("Migration {} adapter is not connected", role),
                ErrorKind::MigrationError,
            ));
        }
    }

    let mut report = MigrationReport {
        dry_run: options.dry_run,
        ..Default::default()
    };
    if !options.dry_run {
        target.initialize_collections(names)?;
    }

    for name in names {
        let documents = source.find(name, &all(), &FindOptions::new()).map_err(|e| {
            DbError::new_with_cause(
                &format!("Cannot read collection {} from {}", name, source.kind()),
                ErrorKind::MigrationError,
                e,
            )
        })?;

        let mut collection = CollectionReport {
            read: documents.len() as u64,
            ..Default::default()
        };
        if options.dry_run {
            collection.copied = collection.read;
            report.collections.insert(name.to_string(), collection);
            continue;
        }

        for document in documents {
            let Some(id) = document.id() else {
                log::warn!("Skipping document without _id in {}", name);
                collection.failed += 1;
                continue;
            };
            match target.insert_one(name, document.clone()) {
                Ok(_) => collection.copied += 1,
                Err(err) if err.is_duplicate_key() && options.overwrite_existing => {
                    match target.update_one(name, &by_id(&id), &Update::set_document(&document), false) {
                        Ok(_) => collection.copied += 1,
                        Err(err) => {
                            log::error!("Failed to overwrite {} in {}: {}", id, name, err);
                            collection.failed += 1;
                        }
                    }
                }
                Err(err) if err.is_duplicate_key() => collection.skipped += 1,
                Err(err) => {
                    log::error!("Failed to copy {} into {}: {}", id, name, err);
                    collection.failed += 1;
                }
            }
        }

        log::info!(
            "Migrated {}: {} copied, {} skipped, {} failed",
            name,
            collection.copied,
            collection.skipped,
            collection.failed
        );
        report.collections.insert(name.to_string(), collection);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockFirebaseAdapter;
    use crate::doc;

    fn connected() -> DatabaseAdapter {
        let adapter = DatabaseAdapter::new(MockFirebaseAdapter::new());
        adapter.connect().unwrap();
        adapter
    }

    #[test]
    fn test_copy_preserves_ids_and_timestamps() {
        let source = connected();
        let target = connected();
        let id = source.insert_one("companies", doc! { "name": "Acme" }).unwrap();
        source.insert_one("stories", doc! { "title": "Solar" }).unwrap();

        let report = migrate_collections(&source, &target, &["companies", "stories"], MigrationOptions::default()).unwrap();
        assert_eq!(report.total_copied(), 2);
        assert_eq!(report.total_failed(), 0);

        let original = source.find_one("companies", &by_id(&id), None).unwrap().unwrap();
        let copy = target.find_one("companies", &by_id(&id), None).unwrap().unwrap();
        assert_eq!(original, copy);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let source = connected();
        let target = connected();
        source.insert_one("companies", doc! { "name": "Acme" }).unwrap();

        let options = MigrationOptions {
            dry_run: true,
            ..Default::default()
        };
        let report = migrate_collections(&source, &target, &["companies"], options).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.collections["companies"].copied, 1);
        assert!(target.list_collections().unwrap().is_empty());
    }

    #[test]
    fn test_existing_ids_skipped_or_overwritten() {
        let source = connected();
        let target = connected();
        source.insert_one("c", doc! { "_id": "k", "v": "new" }).unwrap();
        target.insert_one("c", doc! { "_id": "k", "v": "old" }).unwrap();

        let report = migrate_collections(&source, &target, &["c"], MigrationOptions::default()).unwrap();
        assert_eq!(report.collections["c"].skipped, 1);
        let kept = target.find_one("c", &by_id("k"), None).unwrap().unwrap();
        assert_eq!(kept.get_str("v"), Some("old"));

        let options = MigrationOptions {
            overwrite_existing: true,
            ..Default::default()
        };
        let report = migrate_collections(&source, &target, &["c"], options).unwrap();
        assert_eq!(report.collections["c"].copied, 1);
        let replaced = target.find_one("c", &by_id("k"), None).unwrap().unwrap();
        assert_eq!(replaced.get_str("v"), Some("new"));
    }

    #[test]
    fn test_report_serializes_in_collection_order() {
        let source = connected();
        let target = connected();
        source.insert_one("stories", doc! { "title": "Solar" }).unwrap();

        let report = migrate_collections(&source, &target, &["stories", "companies"], MigrationOptions::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["collections"]["stories"]["copied"], 1);
        let names: Vec<&String> = json["collections"].as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["stories", "companies"]);
    }

    #[test]
    fn test_requires_connected_adapters() {
        let source = DatabaseAdapter::new(MockFirebaseAdapter::new());
        let target = connected();
        let err = migrate_collections(&source, &target, &["c"], MigrationOptions::default()).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MigrationError);
    }
}
