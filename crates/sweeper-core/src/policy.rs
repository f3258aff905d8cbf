//! RetentionPolicy: tenant -> retention period, with a mandatory default.
//!
//! Config shape (days):
//!
//! ```json
//! { "default": 30, "acme": 60, "1001": 120 }
//! ```
//!
//! The wrapped form `{ "retention": { ... } }` is accepted as well.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::domain::TenantId;
use crate::error::ConfigError;

pub const SECS_PER_DAY: u64 = 86_400;

const DEFAULT_KEY: &str = "default";
const WRAPPER_KEY: &str = "retention";

/// Read-only after load; share it through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    default_days: u32,
    overrides: BTreeMap<TenantId, u32>,
}

impl RetentionPolicy {
    /// A table with only the default entry.
    pub fn with_default(days: u32) -> Self {
        Self {
            default_days: days,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, tenant: impl Into<TenantId>, days: u32) -> Self {
        self.overrides.insert(tenant.into(), days);
        self
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_reader(reader)?;
        Self::from_value(value)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let Value::Object(mut root) = value else {
            return Err(ConfigError::Invalid("expected a JSON object".to_string()));
        };

        let table = match root.remove(WRAPPER_KEY) {
            Some(Value::Object(inner)) => inner,
            Some(other) => {
                // a tenant literally called "retention"
                root.insert(WRAPPER_KEY.to_string(), other);
                root
            }
            None => root,
        };

        Self::from_table(table)
    }

    fn from_table(table: Map<String, Value>) -> Result<Self, ConfigError> {
        let default_days = match table.get(DEFAULT_KEY) {
            Some(v) => days_of(DEFAULT_KEY, v)?,
            None => {
                return Err(ConfigError::Invalid(format!(
                    "missing required '{DEFAULT_KEY}' entry"
                )));
            }
        };

        let mut overrides = BTreeMap::new();
        for (key, value) in &table {
            if key == DEFAULT_KEY {
                continue;
            }
            overrides.insert(TenantId::new(key.as_str()), days_of(key, value)?);
        }

        Ok(Self {
            default_days,
            overrides,
        })
    }

    /// Retention period for `tenant`. Unknown tenants get the default.
    pub fn resolve(&self, tenant: &TenantId) -> Duration {
        Duration::from_secs(u64::from(self.resolve_days(tenant)) * SECS_PER_DAY)
    }

    pub fn resolve_days(&self, tenant: &TenantId) -> u32 {
        self.overrides
            .get(tenant)
            .copied()
            .unwrap_or(self.default_days)
    }

    pub fn default_days(&self) -> u32 {
        self.default_days
    }

    /// Tenants with an explicit override, sorted.
    pub fn tenants(&self) -> impl Iterator<Item = (&TenantId, u32)> {
        self.overrides.iter().map(|(t, d)| (t, *d))
    }

    /// Number of per-tenant overrides.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

fn days_of(key: &str, value: &Value) -> Result<u32, ConfigError> {
    value
        .as_u64()
        .and_then(|d| u32::try_from(d).ok())
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "'{key}' must be a non-negative whole number of days, got {value}"
            ))
        })
}
