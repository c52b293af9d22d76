//! Store connection settings from environment variables and TOML files.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::repository::{RepositoryError, RepositoryResult};
use crate::store::RequestOptions;

/// Settings for wiring a store client and its default repository target.
///
/// The crate itself only consumes `repository` (for ids and paging defaults);
/// `store` carries what a concrete client implementation needs to connect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub store: ConnectionSettings,
    #[serde(default)]
    pub repository: TargetSettings,
}

/// Connection settings consumed by the injected store client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub access_key: String,
}

/// The database/collection pair a repository operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Default page-size cap for reads and queries.
    #[serde(default)]
    pub max_page_size: Option<u32>,
}

fn default_endpoint() -> String {
    "memory://local".to_string()
}

fn default_database() -> String {
    "app".to_string()
}

fn default_collection() -> String {
    "items".to_string()
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_key: String::new(),
        }
    }
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            database: default_database(),
            collection: default_collection(),
            max_page_size: None,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store: ConnectionSettings::default(),
            repository: TargetSettings::default(),
        }
    }
}

impl StoreSettings {
    /// Load settings from environment variables.
    ///
    /// # Environment Variables
    /// - `DOCSTORE_ENDPOINT` (optional, default: `memory://local`)
    /// - `DOCSTORE_ACCESS_KEY` (optional)
    /// - `DOCSTORE_DATABASE` (optional, default: `app`)
    /// - `DOCSTORE_COLLECTION` (optional, default: `items`)
    /// - `DOCSTORE_MAX_PAGE_SIZE` (optional): positive integer
    ///
    /// # Errors
    /// Returns an error when `DOCSTORE_MAX_PAGE_SIZE` is set but not a valid
    /// number.
    pub fn from_env() -> RepositoryResult<Self> {
        let endpoint = env::var("DOCSTORE_ENDPOINT").unwrap_or_else(|_| default_endpoint());
        let access_key = env::var("DOCSTORE_ACCESS_KEY").unwrap_or_default();
        let database = env::var("DOCSTORE_DATABASE").unwrap_or_else(|_| default_database());
        let collection = env::var("DOCSTORE_COLLECTION").unwrap_or_else(|_| default_collection());
        let max_page_size = match env::var("DOCSTORE_MAX_PAGE_SIZE") {
            Ok(raw) => Some(raw.parse::<u32>().map_err(|_| {
                RepositoryError::Configuration(
                    "DOCSTORE_MAX_PAGE_SIZE must be a positive integer".to_string(),
                )
            })?),
            Err(_) => None,
        };

        Ok(Self {
            store: ConnectionSettings {
                endpoint,
                access_key,
            },
            repository: TargetSettings {
                database,
                collection,
                max_page_size,
            },
        })
    }

    /// Load settings from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the settings file
    ///
    /// # Returns
    /// * `Ok(StoreSettings)` if successful
    /// * `Err(RepositoryError::Configuration)` if the file cannot be read or
    ///   parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::Configuration(format!("Failed to read settings file: {}", e))
        })?;

        let settings: StoreSettings = toml::from_str(&content).map_err(|e| {
            RepositoryError::Configuration(format!("Failed to parse settings file: {}", e))
        })?;

        Ok(settings)
    }

    /// Request options derived from these settings, when any apply.
    pub fn request_options(&self) -> Option<RequestOptions> {
        self.repository.max_page_size.map(|max_page_size| RequestOptions {
            max_item_count: Some(max_page_size),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = StoreSettings::default();
        assert_eq!(settings.store.endpoint, "memory://local");
        assert_eq!(settings.repository.database, "app");
        assert_eq!(settings.repository.collection, "items");
        assert!(settings.request_options().is_none());
    }

    #[test]
    fn test_parse_full_settings() {
        let toml = r#"
[store]
endpoint = "https://example.documents.azure.com"
access_key = "secret"

[repository]
database = "shop"
collection = "orders"
max_page_size = 50
"#;

        let settings: StoreSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.store.endpoint, "https://example.documents.azure.com");
        assert_eq!(settings.repository.database, "shop");
        assert_eq!(settings.repository.collection, "orders");

        let options = settings.request_options().unwrap();
        assert_eq!(options.max_item_count, Some(50));
    }

    #[test]
    fn test_partial_settings_fall_back_to_defaults() {
        let toml = r#"
[repository]
database = "shop"
"#;

        let settings: StoreSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.repository.database, "shop");
        assert_eq!(settings.repository.collection, "items");
        assert_eq!(settings.store.endpoint, "memory://local");
    }

    #[test]
    fn test_from_file_roundtrip_and_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[repository]\ndatabase = \"shop\"\ncollection = \"orders\"\n"
        )
        .unwrap();

        let settings = StoreSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.repository.database, "shop");
        assert_eq!(settings.repository.collection, "orders");

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "repository = not valid toml").unwrap();
        let outcome = StoreSettings::from_file(broken.path());
        assert!(matches!(
            outcome,
            Err(RepositoryError::Configuration(_))
        ));

        let missing = StoreSettings::from_file("/nonexistent/docstore.toml");
        assert!(matches!(missing, Err(RepositoryError::Configuration(_))));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        env::set_var("DOCSTORE_DATABASE", "shop");
        env::set_var("DOCSTORE_COLLECTION", "orders");
        env::set_var("DOCSTORE_MAX_PAGE_SIZE", "25");

        let settings = StoreSettings::from_env().unwrap();
        assert_eq!(settings.repository.database, "shop");
        assert_eq!(settings.repository.collection, "orders");
        assert_eq!(settings.repository.max_page_size, Some(25));

        env::set_var("DOCSTORE_MAX_PAGE_SIZE", "not-a-number");
        let outcome = StoreSettings::from_env();
        assert!(matches!(
            outcome,
            Err(RepositoryError::Configuration(_))
        ));

        env::remove_var("DOCSTORE_DATABASE");
        env::remove_var("DOCSTORE_COLLECTION");
        env::remove_var("DOCSTORE_MAX_PAGE_SIZE");
    }
}
