pub mod app_config;
pub mod catalog;
pub mod config;

pub use app_config::{AppConfig, Credentials};
pub use catalog::{load_catalog, Catalog, CatalogFile, MealPeriod, Venue};
pub use config::{load_app_config, load_app_config_from_env};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read venue catalog {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse venue catalog: {0}")]
    CatalogFileParse(#[source] serde_yaml::Error),

    #[error("invalid venue catalog: {0}")]
    Validation(String),
}
