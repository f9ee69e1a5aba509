//! Configuration loading from the environment and command line.

use clap::Parser;
use std::ffi::OsString;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Parse error: {0}")]
    Parse(#[from] clap::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from the process environment and arguments.
pub fn load_config() -> Result<ServiceConfig, ConfigError> {
    load_config_from(std::env::args_os())
}

/// Load and validate configuration from explicit arguments. Environment
/// variables still fill in anything the arguments leave out.
pub fn load_config_from<I, T>(args: I) -> Result<ServiceConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let config = ServiceConfig::try_parse_from(args)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
