use std::path::PathBuf;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub variance_epsilon: Decimal,
    pub default_location: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("GALLEY_DATA_DIR").context("GALLEY_DATA_DIR is required")?;
        let variance_epsilon = match std::env::var("GALLEY_VARIANCE_EPSILON") {
            Ok(raw) => parse_epsilon(&raw)?,
            Err(_) => galley_inventory::default_epsilon(),
        };
        let default_location = std::env::var("GALLEY_DEFAULT_LOCATION")
            .ok()
            .filter(|location| !location.trim().is_empty());

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            variance_epsilon,
            default_location,
        })
    }

    /// The explicit location if given, else the configured default.
    pub fn location_or_default(&self, explicit: Option<String>) -> Option<String> {
        explicit.or_else(|| self.default_location.clone())
    }
}

fn parse_epsilon(raw: &str) -> Result<Decimal> {
    let epsilon: Decimal = raw
        .trim()
        .parse()
        .with_context(|| format!("GALLEY_VARIANCE_EPSILON `{raw}` is not a decimal"))?;
    if epsilon < Decimal::ZERO {
        anyhow::bail!("GALLEY_VARIANCE_EPSILON must not be negative");
    }
    Ok(epsilon)
}
