//! Gateway configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment:
//!
//! | Variable                 | Overrides                          |
//! |--------------------------|------------------------------------|
//! | `BUNDLEGATE_STAGING_DIR` | `staging_dir`                      |
//! | `BUNDLEGATE_AUTHOR`      | `default_author`                   |
//! | `BUNDLEGATE_SERVALD`     | store = servald with this binary   |
//! | `BUNDLEGATE_STORE_ROOT`  | store = local rooted here          |

use crate::gateway::{Gateway, DEFAULT_AUTHORITY};
use crate::staging::StagingArea;
use bundlegate_core::errors::io_error;
use bundlegate_core::logging_facility::Profile;
use bundlegate_core::{GwError, GwErrorKind, Result, SubscriberId};
use bundlegate_store::{BundleStore, IdentitySource, LocalStore, ServaldClient, StaticIdentity};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ENV_STAGING_DIR: &str = "BUNDLEGATE_STAGING_DIR";
pub const ENV_AUTHOR: &str = "BUNDLEGATE_AUTHOR";
pub const ENV_SERVALD: &str = "BUNDLEGATE_SERVALD";
pub const ENV_STORE_ROOT: &str = "BUNDLEGATE_STORE_ROOT";

const DEFAULT_SERVALD_BINARY: &str = "servald";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Servald {
        #[serde(default = "default_servald_binary")]
        binary: PathBuf,
        #[serde(default)]
        instance_path: Option<PathBuf>,
    },
    Local {
        root: PathBuf,
    },
}

fn default_servald_binary() -> PathBuf {
    PathBuf::from(DEFAULT_SERVALD_BINARY)
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Servald {
            binary: default_servald_binary(),
            instance_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub authority: String,
    /// `None` uses the shared directory under the system temp dir
    pub staging_dir: Option<PathBuf>,
    /// Hex subscriber id used when an insert gives no author
    pub default_author: Option<String>,
    pub log_profile: Profile,
    pub store: StoreConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            staging_dir: None,
            default_author: None,
            log_profile: Profile::default(),
            store: StoreConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// # Errors
    ///
    /// `InvalidInput` if the document is not valid TOML for this shape.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            GwError::new(GwErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(format!("invalid gateway config: {}", e))
        })
    }

    /// Read the file if given, then apply environment overrides
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `InvalidInput` if it does not parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| io_error("load_config", e))?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides from `lookup`; empty values are ignored
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = get(ENV_STAGING_DIR) {
            self.staging_dir = Some(PathBuf::from(dir));
        }
        if let Some(author) = get(ENV_AUTHOR) {
            self.default_author = Some(author);
        }
        if let Some(binary) = get(ENV_SERVALD) {
            let instance_path = match &self.store {
                StoreConfig::Servald { instance_path, .. } => instance_path.clone(),
                StoreConfig::Local { .. } => None,
            };
            self.store = StoreConfig::Servald {
                binary: PathBuf::from(binary),
                instance_path,
            };
        }
        if let Some(root) = get(ENV_STORE_ROOT) {
            self.store = StoreConfig::Local {
                root: PathBuf::from(root),
            };
        }
        self
    }

    /// # Errors
    ///
    /// `InvalidInput` if `default_author` is not a subscriber id.
    pub fn parsed_default_author(&self) -> Result<Option<SubscriberId>> {
        self.default_author
            .as_deref()
            .map(|text| {
                text.parse::<SubscriberId>()
                    .map_err(|e| GwError::from(e).with_op("load_config"))
            })
            .transpose()
    }
}

/// Wire a gateway from configuration
///
/// A configured `default_author` wins over asking the store for one.
///
/// # Errors
///
/// `InvalidInput` if the configured default author does not parse.
pub fn build_gateway(config: &GatewayConfig) -> Result<Gateway> {
    let configured_author = config.parsed_default_author()?;

    let staging = match &config.staging_dir {
        Some(dir) => Arc::new(StagingArea::new(dir)),
        None => StagingArea::process_default(),
    };

    let (store, identity): (Arc<dyn BundleStore>, Arc<dyn IdentitySource>) = match &config.store {
        StoreConfig::Servald {
            binary,
            instance_path,
        } => {
            let mut client = ServaldClient::new(binary);
            if let Some(instance) = instance_path {
                client = client.with_instance_path(instance);
            }
            let client = Arc::new(client);
            let identity: Arc<dyn IdentitySource> = match configured_author {
                Some(sid) => Arc::new(StaticIdentity(Some(sid))),
                None => client.clone(),
            };
            let store: Arc<dyn BundleStore> = client;
            (store, identity)
        }
        StoreConfig::Local { root } => {
            let store: Arc<dyn BundleStore> = Arc::new(LocalStore::new(root));
            let identity: Arc<dyn IdentitySource> = Arc::new(StaticIdentity(configured_author));
            (store, identity)
        }
    };

    tracing::debug!(
        authority = %config.authority,
        staging_dir = %staging.root().display(),
        "Gateway configured"
    );

    Ok(Gateway::new(store, identity, staging).with_authority(config.authority.clone()))
}
