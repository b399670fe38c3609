use crate::adapter::dual::DualDatabaseAdapter;
use crate::adapter::firebase::FirebaseAdapter;
use crate::adapter::mock::MockFirebaseAdapter;
use crate::adapter::{AdapterKind, DatabaseAdapter};
use crate::config::DatabaseConfig;
use crate::errors::{DbError, DbResult, ErrorKind};

/// The adapter chosen by [get_database_adapter].
#[derive(Debug, Clone)]
pub enum AdapterSelection {
    /// The requested backend.
    Real(DatabaseAdapter),
    /// The requested backend is not compiled into this build; the in-memory
    /// store stands in for it.
    Fallback {
        requested: AdapterKind,
        adapter: DatabaseAdapter,
    },
}

impl AdapterSelection {
    pub fn adapter(&self) -> &DatabaseAdapter {
        match self {
            AdapterSelection::Real(adapter) => adapter,
            AdapterSelection::Fallback { adapter, .. } => adapter,
        }
    }

    pub fn into_adapter(self) -> DatabaseAdapter {
        match self {
            AdapterSelection::Real(adapter) => adapter,
            AdapterSelection::Fallback { adapter, .. } => adapter,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, AdapterSelection::Fallback { .. })
    }
}

/// Builds the adapter for `kind`, or for the configured adapter when `kind`
/// is `None`. The adapter is returned disconnected.
///
/// A Firebase adapter is only substituted here when the `firebase` feature
/// is off; credential problems are handled later by the adapter's own
/// fallback at connect time.
///
/// # Errors
///
/// [ErrorKind::ConfigError] when a dual adapter is configured with `dual`
/// as its primary or secondary.
pub fn get_database_adapter(config: &DatabaseConfig, kind: Option<AdapterKind>) -> DbResult<AdapterSelection> {
    let requested = kind.unwrap_or_else(|| config.adapter());
    log::debug!("Creating {} database adapter", requested);

    match requested {
        AdapterKind::Dual => {
            let primary = single_adapter(config, config.primary())?.into_adapter();
            let secondary = single_adapter(config, config.secondary())?.into_adapter();
            log::info!(
                "Using dual database adapter (primary {}, secondary {})",
                config.primary(),
                config.secondary()
            );
            Ok(AdapterSelection::Real(DatabaseAdapter::new(DualDatabaseAdapter::new(
                primary, secondary,
            ))))
        }
        other => single_adapter(config, other),
    }
}

fn single_adapter(config: &DatabaseConfig, kind: AdapterKind) -> DbResult<AdapterSelection> {
    match kind {
        AdapterKind::MockFirebase => Ok(AdapterSelection::Real(DatabaseAdapter::new(MockFirebaseAdapter::new()))),
        AdapterKind::Firebase => firebase_adapter(config),
        AdapterKind::MongoDb => mongodb_adapter(config),
        AdapterKind::Dual => {
            log::error!("A dual adapter cannot contain another dual adapter");
            Err(DbError::new(
                "A dual adapter cannot contain another dual adapter",
                ErrorKind::ConfigError,
            ))
        }
    }
}

#[cfg(not(all(feature = "firebase", feature = "mongodb")))]
fn fallback(requested: AdapterKind) -> AdapterSelection {
    log::warn!(
        "{} support is not compiled into this build, using in-memory mock adapter",
        requested
    );
    AdapterSelection::Fallback {
        requested,
        adapter: DatabaseAdapter::new(MockFirebaseAdapter::new()),
    }
}

#[cfg(feature = "firebase")]
fn firebase_adapter(config: &DatabaseConfig) -> DbResult<AdapterSelection> {
    Ok(AdapterSelection::Real(DatabaseAdapter::new(FirebaseAdapter::new(
        config.firebase().clone(),
    ))))
}

#[cfg(not(feature = "firebase"))]
fn firebase_adapter(_config: &DatabaseConfig) -> DbResult<AdapterSelection> {
    Ok(fallback(AdapterKind::Firebase))
}

#[cfg(feature = "mongodb")]
fn mongodb_adapter(config: &DatabaseConfig) -> DbResult<AdapterSelection> {
    use crate::adapter::mongodb::MongoDbAdapter;

    Ok(AdapterSelection::Real(DatabaseAdapter::new(MongoDbAdapter::new(
        config.mongodb().clone(),
    ))))
}

#[cfg(not(feature = "mongodb"))]
fn mongodb_adapter(_config: &DatabaseConfig) -> DbResult<AdapterSelection> {
    Ok(fallback(AdapterKind::MongoDb))
}

/// Builds a Firebase adapter regardless of the compiled features. Without
/// the `firebase` feature it always connects to its in-memory fallback.
pub fn firebase_with_fallback(config: &DatabaseConfig) -> DatabaseAdapter {
    DatabaseAdapter::new(FirebaseAdapter::new(config.firebase().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mock() {
        let selection = get_database_adapter(&DatabaseConfig::default(), None).unwrap();
        assert!(!selection.is_fallback());
        assert_eq!(selection.adapter().kind(), AdapterKind::MockFirebase);
    }

    #[test]
    fn test_explicit_kind_overrides_config() {
        let selection = get_database_adapter(&DatabaseConfig::default(), Some(AdapterKind::Dual)).unwrap();
        assert_eq!(selection.adapter().kind(), AdapterKind::Dual);
    }

    #[cfg(not(feature = "firebase"))]
    #[test]
    fn test_firebase_without_feature_falls_back() {
        let selection = get_database_adapter(&DatabaseConfig::default(), Some(AdapterKind::Firebase)).unwrap();
        match selection {
            AdapterSelection::Fallback { requested, adapter } => {
                assert_eq!(requested, AdapterKind::Firebase);
                assert_eq!(adapter.kind(), AdapterKind::MockFirebase);
            }
            AdapterSelection::Real(_) => panic!("expected fallback"),
        }
    }

    #[cfg(feature = "mongodb")]
    #[test]
    fn test_mongodb_is_real() {
        let selection = get_database_adapter(&DatabaseConfig::default(), Some(AdapterKind::MongoDb)).unwrap();
        assert!(!selection.is_fallback());
        assert_eq!(selection.adapter().kind(), AdapterKind::MongoDb);
        assert!(!selection.adapter().is_connected());
    }

    #[test]
    fn test_nested_dual_rejected() {
        let config = DatabaseConfig::with_config()
            .adapter(AdapterKind::Dual)
            .primary(AdapterKind::Dual)
            .build();
        let err = get_database_adapter(&config, None).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConfigError);
    }

    #[test]
    fn test_firebase_with_fallback_connects() {
        let adapter = firebase_with_fallback(&DatabaseConfig::default());
        assert!(adapter.connect().unwrap());
        assert!(adapter.is_fallback());
        assert_eq!(adapter.kind(), AdapterKind::Firebase);
    }
}
