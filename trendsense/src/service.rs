use serde::Serialize;
use std::sync::Arc;

use crate::adapter::{AdapterKind, DatabaseAdapter};
use crate::common::DEFAULT_COLLECTIONS;
use crate::compat::LenientAdapter;
use crate::config::DatabaseConfig;
use crate::errors::DbResult;
use crate::factory::{get_database_adapter, AdapterSelection};

/// Connectivity report for health endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// Backend asked for in the configuration.
    pub requested: AdapterKind,
    /// Backend actually serving requests.
    pub kind: AdapterKind,
    pub connected: bool,
    /// `true` when an in-memory store is standing in for the requested
    /// backend, either because it is not compiled in or because Firestore
    /// could not be initialized.
    pub fallback: bool,
}

/// Owns the application's database adapter.
///
/// The service is constructed once at startup, connects immediately and is
/// then cloned into every component that needs the database. Clones share
/// the adapter.
#[derive(Clone, Debug)]
pub struct DatabaseService {
    inner: Arc<ServiceInner>,
}

#[derive(Debug)]
struct ServiceInner {
    adapter: DatabaseAdapter,
    requested: AdapterKind,
    substituted: bool,
}

impl DatabaseService {
    /// Builds the configured adapter and connects it.
    ///
    /// An unreachable backend does not fail construction; it shows up in
    /// [status](DatabaseService::status) instead.
    pub fn new(config: &DatabaseConfig) -> DbResult<DatabaseService> {
        let selection = get_database_adapter(config, None)?;
        let (requested, substituted) = match &selection {
            AdapterSelection::Real(adapter) => (adapter.kind(), false),
            AdapterSelection::Fallback { requested, .. } => (*requested, true),
        };
        DatabaseService::start(selection.into_adapter(), requested, substituted)
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> DbResult<DatabaseService> {
        DatabaseService::new(&DatabaseConfig::from_env()?)
    }

    /// Wraps an adapter built elsewhere and connects it.
    pub fn with_adapter(adapter: DatabaseAdapter) -> DbResult<DatabaseService> {
        let requested = adapter.kind();
        DatabaseService::start(adapter, requested, false)
    }

    fn start(adapter: DatabaseAdapter, requested: AdapterKind, substituted: bool) -> DbResult<DatabaseService> {
        if adapter.connect()? {
            log::info!("Database service started with {} adapter", adapter.kind());
        } else {
            log::error!("Database service could not connect its {} adapter", adapter.kind());
        }
        Ok(DatabaseService {
            inner: Arc::new(ServiceInner {
                adapter,
                requested,
                substituted,
            }),
        })
    }

    pub fn adapter(&self) -> &DatabaseAdapter {
        &self.inner.adapter
    }

    /// The adapter behind the legacy neutral-value contract.
    pub fn lenient(&self) -> LenientAdapter {
        LenientAdapter::new(self.inner.adapter.clone())
    }

    /// Creates the collections every TrendSense deployment expects.
    pub fn initialize(&self) -> DbResult<()> {
        self.inner.adapter.initialize_collections(&DEFAULT_COLLECTIONS)
    }

    /// Reconnects when the adapter dropped its connection.
    pub fn ensure_connected(&self) -> DbResult<bool> {
        if self.inner.adapter.is_connected() {
            return Ok(true);
        }
        log::warn!("Database adapter {} is disconnected, reconnecting", self.inner.adapter.kind());
        self.inner.adapter.connect()
    }

    pub fn status(&self) -> ServiceStatus {
        let adapter = &self.inner.adapter;
        let kind = if self.inner.substituted {
            AdapterKind::MockFirebase
        } else {
            adapter.kind()
        };
        ServiceStatus {
            requested: self.inner.requested,
            kind,
            connected: adapter.is_connected(),
            fallback: self.inner.substituted || adapter.is_fallback(),
        }
    }

    pub fn shutdown(&self) -> DbResult<()> {
        log::info!("Shutting down database service");
        self.inner.adapter.disconnect()
    }
}
