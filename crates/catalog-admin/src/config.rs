//! Command line configuration for `catalog-admin`.
//!
//! Every option falls back to the same environment variable the catalog
//! library reads, so a deployment's environment works unchanged.

use clap::{Parser, Subcommand};
use helios_catalog::CatalogConfig;
use helios_catalog::backends::mongodb::MongoConfig;

/// Administrative tool for the catalog backend.
#[derive(Debug, Clone, Parser)]
#[command(name = "catalog-admin")]
#[command(about = "Catalog backend administration: index creation and inspection")]
pub struct AdminConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CATALOG_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// MongoDB host.
    #[arg(long, env = "MONGO_HOST", default_value = "localhost")]
    pub mongo_host: String,

    /// MongoDB port, ignored for `mongodb+srv` hosts.
    #[arg(long, env = "MONGO_PORT", default_value = "27017")]
    pub mongo_port: u16,

    /// MongoDB user.
    #[arg(long, env = "MONGO_USER")]
    pub mongo_user: Option<String>,

    /// MongoDB password.
    #[arg(long, env = "MONGO_PASS", hide_env_values = true)]
    pub mongo_password: Option<String>,

    /// Connect with TLS.
    #[arg(long, env = "MONGO_USE_SSL", default_value = "false")]
    pub mongo_use_ssl: bool,

    /// Verify server certificates when TLS is enabled.
    #[arg(long, env = "MONGO_VERIFY_CERTS", default_value = "true")]
    pub mongo_verify_certs: bool,

    /// Connection string; a `mongodb+srv` value selects the SRV URI form.
    #[arg(long, env = "MONGO_CONNECTION_STRING", hide_env_values = true)]
    pub mongo_connection_string: Option<String>,

    /// Database holding both namespaces.
    #[arg(long, env = "MONGO_DB", default_value = "admin")]
    pub database: String,

    /// Namespace for collection records.
    #[arg(long, env = "STAC_COLLECTIONS_INDEX", default_value = "collections")]
    pub collections_index: String,

    /// Namespace for item records.
    #[arg(long, env = "STAC_ITEMS_INDEX", default_value = "items")]
    pub items_index: String,

    /// Skip the startup index pass.
    #[arg(long, default_value = "false")]
    pub skip_indexes: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// What to run once connected.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the collection and item indexes and report the outcome.
    InitIndexes,

    /// Print every collection id with its item count as JSON.
    Summary {
        /// Collections fetched per listing page.
        #[arg(long, default_value = "100")]
        page_size: u64,
    },
}

impl AdminConfig {
    /// Builds the catalog configuration from these options.
    pub fn catalog_config(&self) -> CatalogConfig {
        let mut config = CatalogConfig {
            database: self.database.clone(),
            ..CatalogConfig::default()
        }
        .with_namespaces(&self.collections_index, &self.items_index);
        if self.skip_indexes {
            config = config.without_index_creation();
        }
        config
    }

    /// Builds the connection configuration from these options.
    pub fn mongo_config(&self) -> MongoConfig {
        MongoConfig {
            host: self.mongo_host.clone(),
            port: self.mongo_port,
            user: self.mongo_user.clone(),
            password: self.mongo_password.clone(),
            use_ssl: self.mongo_use_ssl,
            verify_certs: self.mongo_verify_certs,
            connection_string: self.mongo_connection_string.clone(),
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.catalog_config().validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.mongo_connection_string.is_none() && self.mongo_host.is_empty() {
            errors.push("MongoDB host cannot be empty".to_string());
        }

        if self.mongo_password.is_some() && self.mongo_user.is_none() {
            errors.push("MongoDB password given without a user".to_string());
        }

        if let Command::Summary { page_size } = self.command
            && page_size == 0
        {
            errors.push("Summary page size must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
