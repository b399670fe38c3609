use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::errors::{DbError, ErrorKind};

/// The backends an adapter can be built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    #[serde(rename = "mongodb")]
    MongoDb,
    Firebase,
    MockFirebase,
    Dual,
}

impl AdapterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::MongoDb => "mongodb",
            AdapterKind::Firebase => "firebase",
            AdapterKind::MockFirebase => "mock_firebase",
            AdapterKind::Dual => "dual",
        }
    }
}

impl Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AdapterKind {
    type Err = DbError;

    /// Parses an adapter name, case-insensitively. `mongo`, `firestore` and
    /// `mock` are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(AdapterKind::MongoDb),
            "firebase" | "firestore" => Ok(AdapterKind::Firebase),
            "mock_firebase" | "mock" => Ok(AdapterKind::MockFirebase),
            "dual" => Ok(AdapterKind::Dual),
            other => {
                log::error!("Unknown database adapter type {}", other);
                Err(DbError::new(
                    &format!("Unknown database adapter type: {}", other),
                    ErrorKind::ConfigError,
                ))
            }
        }
    }
}
