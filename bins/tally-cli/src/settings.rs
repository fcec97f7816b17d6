//! Layered configuration: optional file, then `TALLY__*` environment
//! variables, on top of [`LedgerConfig::default`].

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use tally_ledger::LedgerConfig;

/// Load the ledger configuration.
///
/// An explicitly named file must exist. Nested keys in the environment use a
/// double underscore, e.g. `TALLY__MINIMUM_RATE_PERIOD_DAYS=2`.
pub fn load(path: Option<&Path>) -> Result<LedgerConfig> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(
        Environment::with_prefix("TALLY")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .context("failed to read configuration")?
        .try_deserialize()
        .context("invalid configuration")
}
