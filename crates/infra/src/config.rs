//! Store configuration loading and representation.
//!
//! Settings come from the environment:
//!
//! | Variable | Required | Meaning |
//! |---|---|---|
//! | `STOCKCOUNT_PROJECT_ID` | yes | hosted database project |
//! | `STOCKCOUNT_CREDENTIALS` | no | path to a service-account file |
//! | `STOCKCOUNT_COLLECTION_PREFIX` | no | prefix for every root collection |

use std::path::PathBuf;

use thiserror::Error;

use crate::document_store::CollectionPath;

pub const PROJECT_ID_VAR: &str = "STOCKCOUNT_PROJECT_ID";
pub const CREDENTIALS_VAR: &str = "STOCKCOUNT_CREDENTIALS";
pub const COLLECTION_PREFIX_VAR: &str = "STOCKCOUNT_COLLECTION_PREFIX";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Opaque credentials reference. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(PathBuf);

impl Credentials {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &std::path::Path {
        &self.0
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Names of the collections the tracker reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    inventory: CollectionPath,
    stock_counts: CollectionPath,
    inventory_log: CollectionPath,
    waste_logs: CollectionPath,
}

impl Collections {
    /// Sub-collection of a day document holding per-item counts.
    pub const DAY_ITEMS: &'static str = "items";
    /// Sub-collection of a variance log holding per-item records.
    pub const VARIANT_ITEMS: &'static str = "variantItems";
    /// Sub-collection of a waste log holding per-item records.
    pub const WASTE_ITEMS: &'static str = "wasteItems";

    pub fn with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Invalid {
                key: COLLECTION_PREFIX_VAR,
                reason: format!("`{prefix}` may only contain letters, digits, '_' and '-'"),
            });
        }

        let root = |name: &str| {
            CollectionPath::root(format!("{prefix}{name}")).map_err(|e| ConfigError::Invalid {
                key: COLLECTION_PREFIX_VAR,
                reason: e.to_string(),
            })
        };

        Ok(Self {
            inventory: root("inventory")?,
            stock_counts: root("stockCounts")?,
            inventory_log: root("inventoryLog")?,
            waste_logs: root("wasteLogs")?,
        })
    }

    /// Catalog items with packaging ratios and stock on hand.
    pub fn inventory(&self) -> &CollectionPath {
        &self.inventory
    }

    /// Day documents keyed by `YYYY-MM-DD`.
    pub fn stock_counts(&self) -> &CollectionPath {
        &self.stock_counts
    }

    pub fn inventory_log(&self) -> &CollectionPath {
        &self.inventory_log
    }

    pub fn waste_logs(&self) -> &CollectionPath {
        &self.waste_logs
    }
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            inventory: default_root("inventory"),
            stock_counts: default_root("stockCounts"),
            inventory_log: default_root("inventoryLog"),
            waste_logs: default_root("wasteLogs"),
        }
    }
}

fn default_root(name: &'static str) -> CollectionPath {
    CollectionPath::builtin(name)
}

/// Connection settings handed to a store implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub project_id: String,
    pub credentials: Option<Credentials>,
    pub collections: Collections,
}

impl StoreConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from any key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let project_id = get(PROJECT_ID_VAR).ok_or(ConfigError::Missing(PROJECT_ID_VAR))?;
        let credentials = get(CREDENTIALS_VAR).map(Credentials::new);
        let collections = match get(COLLECTION_PREFIX_VAR) {
            Some(prefix) => Collections::with_prefix(&prefix)?,
            None => Collections::default(),
        };

        Ok(Self {
            project_id,
            credentials,
            collections,
        })
    }
}
