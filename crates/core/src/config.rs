//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services.
//! Request handling never reads process-wide environment variables.

use crate::constants::{DEFAULT_CENSUS_COLLECTION, DEFAULT_MORTALITY_COLLECTION};
use crate::error::{CensusError, CensusResult};
use crate::record::Collection;
use crate::store::is_safe_collection_name;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    census_collection: String,
    mortality_collection: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError::InvalidInput`] if either collection name is not a safe
    /// identifier, or if both name the same collection.
    pub fn new(
        data_dir: PathBuf,
        census_collection: String,
        mortality_collection: String,
    ) -> CensusResult<Self> {
        for name in [&census_collection, &mortality_collection] {
            if !is_safe_collection_name(name) {
                return Err(CensusError::InvalidInput(format!(
                    "collection name '{name}' must be non-empty ASCII alphanumerics, '_' or '-'"
                )));
            }
        }

        if census_collection == mortality_collection {
            return Err(CensusError::InvalidInput(
                "census and mortality collections must differ".into(),
            ));
        }

        Ok(Self {
            data_dir,
            census_collection,
            mortality_collection,
        })
    }

    /// Configuration with the default collection names.
    pub fn with_defaults(data_dir: PathBuf) -> CensusResult<Self> {
        Self::new(
            data_dir,
            DEFAULT_CENSUS_COLLECTION.into(),
            DEFAULT_MORTALITY_COLLECTION.into(),
        )
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn census_collection(&self) -> &str {
        &self.census_collection
    }

    pub fn mortality_collection(&self) -> &str {
        &self.mortality_collection
    }

    pub fn collection_name(&self, collection: Collection) -> &str {
        match collection {
            Collection::Census => &self.census_collection,
            Collection::Mortality => &self.mortality_collection,
        }
    }
}

/// Resolve a collection name from an optional environment value.
///
/// `None` or empty/whitespace falls back to `default`.
pub fn collection_from_env_value(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_defaults_uses_dashboard_collections() {
        let cfg = CoreConfig::with_defaults(PathBuf::from("/tmp/ward")).unwrap();
        assert_eq!(cfg.collection_name(Collection::Census), "patients");
        assert_eq!(cfg.collection_name(Collection::Mortality), "mortality_records");
        assert_eq!(cfg.data_dir(), Path::new("/tmp/ward"));
    }

    #[test]
    fn test_rejects_unsafe_collection_names() {
        let result = CoreConfig::new(
            PathBuf::from("/tmp/ward"),
            "../patients".into(),
            "mortality_records".into(),
        );
        assert!(matches!(result, Err(CensusError::InvalidInput(_))));

        let result = CoreConfig::new(PathBuf::from("/tmp/ward"), "".into(), "m".into());
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_identical_collections() {
        let result = CoreConfig::new(
            PathBuf::from("/tmp/ward"),
            "records".into(),
            "records".into(),
        );
        assert!(matches!(result, Err(CensusError::InvalidInput(_))));
    }

    #[test]
    fn test_collection_from_env_value() {
        assert_eq!(collection_from_env_value(None, "patients"), "patients");
        assert_eq!(
            collection_from_env_value(Some("   ".into()), "patients"),
            "patients"
        );
        assert_eq!(
            collection_from_env_value(Some(" hdu_census ".into()), "patients"),
            "hdu_census"
        );
    }
}
