//! Adapter configuration.
//!
//! [DatabaseConfig] is normally read from the process environment with
//! [DatabaseConfig::from_env]. Tests and embedders use
//! [DatabaseConfig::from_lookup] with their own key lookup, or build one
//! directly:
//!
//! ```rust,ignore
//! let config = DatabaseConfig::with_config()
//!     .adapter(AdapterKind::Dual)
//!     .primary(AdapterKind::MockFirebase)
//!     .secondary(AdapterKind::MongoDb)
//!     .mongodb(MongoConfig::new().database("analytics"))
//!     .build();
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapter::AdapterKind;
use crate::common::*;
use crate::errors::{DbError, DbResult, ErrorKind};

/// Connection settings for the MongoDB adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    uri: String,
    database: String,
    max_pool_size: u32,
    server_selection_timeout: Duration,
}

impl Default for MongoConfig {
    fn default() -> Self {
        MongoConfig {
            uri: DEFAULT_MONGODB_URI.to_string(),
            database: DEFAULT_MONGODB_DATABASE.to_string(),
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            server_selection_timeout: Duration::from_secs(DEFAULT_SERVER_SELECTION_TIMEOUT_SECS),
        }
    }
}

impl MongoConfig {
    pub fn new() -> MongoConfig {
        MongoConfig::default()
    }

    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    pub fn database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = size;
        self
    }

    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    pub fn get_uri(&self) -> &str {
        &self.uri
    }

    pub fn get_database(&self) -> &str {
        &self.database
    }

    pub fn get_max_pool_size(&self) -> u32 {
        self.max_pool_size
    }

    pub fn get_server_selection_timeout(&self) -> Duration {
        self.server_selection_timeout
    }

    /// Connection string with any password masked, for logging.
    pub fn redacted_uri(&self) -> String {
        match (self.uri.find("://"), self.uri.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                let credentials = &self.uri[scheme_end + 3..at];
                let user = credentials.split(':').next().unwrap_or_default();
                format!("{}{}:****{}", &self.uri[..scheme_end + 3], user, &self.uri[at..])
            }
            _ => self.uri.clone(),
        }
    }
}

/// Settings for the Firebase adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirebaseConfig {
    credentials_path: Option<PathBuf>,
    project_id: Option<String>,
    legacy_stage_requery: bool,
}

impl FirebaseConfig {
    pub fn new() -> FirebaseConfig {
        FirebaseConfig::default()
    }

    /// Path of the service-account JSON key file.
    pub fn credentials_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.credentials_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the project id stored in the credentials file.
    pub fn project_id(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    /// Makes `$sort`, `$limit` and `$skip` aggregation stages start again
    /// from the whole collection instead of the previous stage's output.
    /// Only for callers that depend on that historical behavior.
    pub fn legacy_stage_requery(mut self, enabled: bool) -> Self {
        self.legacy_stage_requery = enabled;
        self
    }

    pub fn get_credentials_path(&self) -> Option<&Path> {
        self.credentials_path.as_deref()
    }

    pub fn get_project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn is_legacy_stage_requery(&self) -> bool {
        self.legacy_stage_requery
    }
}

/// Complete adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    adapter: AdapterKind,
    primary: AdapterKind,
    secondary: AdapterKind,
    mongodb: MongoConfig,
    firebase: FirebaseConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            adapter: AdapterKind::MockFirebase,
            primary: AdapterKind::Firebase,
            secondary: AdapterKind::MongoDb,
            mongodb: MongoConfig::default(),
            firebase: FirebaseConfig::default(),
        }
    }
}

impl DatabaseConfig {
    #[inline]
    pub fn with_config() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder::new()
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> DbResult<DatabaseConfig> {
        DatabaseConfig::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::ConfigError] for an unknown adapter name or a
    /// malformed pool size.
    pub fn from_lookup<F>(lookup: F) -> DbResult<DatabaseConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = DatabaseConfig::default();

        let kind = |key: &str, default: AdapterKind| -> DbResult<AdapterKind> {
            match get(key) {
                Some(name) => name.parse(),
                None => Ok(default),
            }
        };

        let mut mongodb = MongoConfig::default();
        if let Some(uri) = get(ENV_MONGODB_URI) {
            mongodb = mongodb.uri(&uri);
        }
        if let (Some(username), Some(password)) = (get(ENV_MONGODB_USERNAME), get(ENV_MONGODB_PASSWORD)) {
            let uri = atlas_uri(&username, &password, mongodb.get_uri());
            mongodb = mongodb.uri(&uri);
        }
        if let Some(database) = get(ENV_MONGODB_DB) {
            mongodb = mongodb.database(&database);
        }
        if let Some(size) = get(ENV_MONGODB_MAX_POOL_SIZE) {
            let size = size.parse::<u32>().map_err(|_| {
                log::error!("{} must be a positive integer, found {}", ENV_MONGODB_MAX_POOL_SIZE, size);
                DbError::new(
                    &format!("{} must be a positive integer", ENV_MONGODB_MAX_POOL_SIZE),
                    ErrorKind::ConfigError,
                )
            })?;
            mongodb = mongodb.max_pool_size(size);
        }

        let mut firebase = FirebaseConfig::default();
        if let Some(path) = get(ENV_FIREBASE_CREDENTIALS_PATH) {
            firebase = firebase.credentials_path(path);
        }
        if let Some(project_id) = get(ENV_FIREBASE_PROJECT_ID) {
            firebase = firebase.project_id(&project_id);
        }

        Ok(DatabaseConfig {
            adapter: kind(ENV_DATABASE_ADAPTER, defaults.adapter)?,
            primary: kind(ENV_PRIMARY_DATABASE_ADAPTER, defaults.primary)?,
            secondary: kind(ENV_SECONDARY_DATABASE_ADAPTER, defaults.secondary)?,
            mongodb,
            firebase,
        })
    }

    pub fn adapter(&self) -> AdapterKind {
        self.adapter
    }

    pub fn primary(&self) -> AdapterKind {
        self.primary
    }

    pub fn secondary(&self) -> AdapterKind {
        self.secondary
    }

    pub fn mongodb(&self) -> &MongoConfig {
        &self.mongodb
    }

    pub fn firebase(&self) -> &FirebaseConfig {
        &self.firebase
    }
}

pub struct DatabaseConfigBuilder {
    config: DatabaseConfig,
}

impl DatabaseConfigBuilder {
    #[inline]
    pub fn new() -> DatabaseConfigBuilder {
        DatabaseConfigBuilder {
            config: DatabaseConfig::default(),
        }
    }

    pub fn adapter(mut self, kind: AdapterKind) -> Self {
        self.config.adapter = kind;
        self
    }

    pub fn primary(mut self, kind: AdapterKind) -> Self {
        self.config.primary = kind;
        self
    }

    pub fn secondary(mut self, kind: AdapterKind) -> Self {
        self.config.secondary = kind;
        self
    }

    pub fn mongodb(mut self, mongodb: MongoConfig) -> Self {
        self.config.mongodb = mongodb;
        self
    }

    pub fn firebase(mut self, firebase: FirebaseConfig) -> Self {
        self.config.firebase = firebase;
        self
    }

    pub fn build(self) -> DatabaseConfig {
        self.config
    }
}

impl Default for DatabaseConfigBuilder {
    fn default() -> Self {
        DatabaseConfigBuilder::new()
    }
}

/// Builds a MongoDB Atlas SRV connection string for the cluster host named
/// in `base_uri`, with percent-encoded credentials.
pub fn atlas_uri(username: &str, password: &str, base_uri: &str) -> String {
    let host = cluster_host(base_uri);
    format!(
        "mongodb+srv://{}:{}@{}/?retryWrites=true&w=majority",
        urlencoding::encode(username),
        urlencoding::encode(password),
        host
    )
}

fn cluster_host(uri: &str) -> &str {
    let rest = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    let rest = rest.rsplit_once('@').map(|(_, host)| host).unwrap_or(rest);
    rest.split(['/', '?']).next().unwrap_or(rest)
}
