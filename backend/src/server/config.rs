//! Process settings loaded via OrthoConfig.
//!
//! Values come from `DELIVERY_*` environment variables, an optional
//! configuration file, and command-line flags. Unset values fall back to the
//! defaults below; the sweep thresholds default to [`MaintenanceConfig`]'s.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{MaintenanceConfig, MaintenanceConfigError};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;

/// Settings shared by the HTTP server and the `run-sweep` binary.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DELIVERY")]
pub struct AppSettings {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string. Required unless `in_memory` is set.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Serve from process memory instead of PostgreSQL.
    #[ortho_config(default = false)]
    pub in_memory: bool,
    /// Minutes a pending order may wait for the restaurant.
    pub unconfirmed_timeout_minutes: Option<i64>,
    /// Days before a delivered or cancelled order is archived.
    pub archive_after_days: Option<i64>,
    /// Minutes without a heartbeat before a driver is marked unavailable.
    pub availability_timeout_minutes: Option<i64>,
    /// Maximum rows selected per sweep run.
    pub sweep_batch_size: Option<i64>,
    /// Seconds between unconfirmed-order sweeps.
    pub expire_unconfirmed_every_secs: Option<u64>,
    /// Seconds between archival sweeps.
    pub archive_completed_every_secs: Option<u64>,
    /// Seconds between availability sweeps.
    pub expire_availability_every_secs: Option<u64>,
}

/// Rejected settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("bind address {value:?} is not a socket address")]
    InvalidBindAddr { value: String },
    #[error("database_url is required unless in_memory is enabled")]
    MissingDatabaseUrl,
    #[error("{field} is out of range")]
    OutOfRange { field: &'static str },
    #[error(transparent)]
    Maintenance(#[from] MaintenanceConfigError),
}

/// Where orders and availability rows live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local maps; contents vanish on exit.
    InMemory,
    /// PostgreSQL through a pooled async connection.
    Postgres {
        database_url: String,
        pool_max_size: u32,
    },
}

fn threshold(
    value: Option<i64>,
    fallback: TimeDelta,
    field: &'static str,
    to_delta: fn(i64) -> Option<TimeDelta>,
) -> Result<TimeDelta, SettingsError> {
    match value {
        Some(raw) => to_delta(raw).ok_or(SettingsError::OutOfRange { field }),
        None => Ok(fallback),
    }
}

impl AppSettings {
    /// Parse the configured bind address, falling back to the default.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|_| SettingsError::InvalidBindAddr {
            value: raw.to_owned(),
        })
    }

    /// Select the storage backend.
    pub fn storage(&self) -> Result<StorageBackend, SettingsError> {
        if self.in_memory {
            return Ok(StorageBackend::InMemory);
        }
        let database_url = self
            .database_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)?;
        Ok(StorageBackend::Postgres {
            database_url,
            pool_max_size: self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE),
        })
    }

    /// Build and validate the sweep configuration.
    pub fn maintenance_config(&self) -> Result<MaintenanceConfig, SettingsError> {
        let defaults = MaintenanceConfig::default();
        let config = MaintenanceConfig {
            unconfirmed_timeout: threshold(
                self.unconfirmed_timeout_minutes,
                defaults.unconfirmed_timeout,
                "unconfirmed_timeout_minutes",
                TimeDelta::try_minutes,
            )?,
            archive_after: threshold(
                self.archive_after_days,
                defaults.archive_after,
                "archive_after_days",
                TimeDelta::try_days,
            )?,
            availability_timeout: threshold(
                self.availability_timeout_minutes,
                defaults.availability_timeout,
                "availability_timeout_minutes",
                TimeDelta::try_minutes,
            )?,
            batch_size: self.sweep_batch_size.unwrap_or(defaults.batch_size),
            expire_unconfirmed_every: self
                .expire_unconfirmed_every_secs
                .map_or(defaults.expire_unconfirmed_every, Duration::from_secs),
            archive_completed_every: self
                .archive_completed_every_secs
                .map_or(defaults.archive_completed_every, Duration::from_secs),
            expire_availability_every: self
                .expire_availability_every_secs
                .map_or(defaults.expire_availability_every, Duration::from_secs),
        };
        Ok(config.validate()?)
    }
}

#[cfg(test)]
mod tests {
    //! Settings parsing from the environment.

    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    use super::*;

    const VARS: [&str; 11] = [
        "DELIVERY_BIND_ADDR",
        "DELIVERY_DATABASE_URL",
        "DELIVERY_POOL_MAX_SIZE",
        "DELIVERY_IN_MEMORY",
        "DELIVERY_UNCONFIRMED_TIMEOUT_MINUTES",
        "DELIVERY_ARCHIVE_AFTER_DAYS",
        "DELIVERY_AVAILABILITY_TIMEOUT_MINUTES",
        "DELIVERY_SWEEP_BATCH_SIZE",
        "DELIVERY_EXPIRE_UNCONFIRMED_EVERY_SECS",
        "DELIVERY_ARCHIVE_COMPLETED_EVERY_SECS",
        "DELIVERY_EXPIRE_AVAILABILITY_EVERY_SECS",
    ];

    fn env_with(overrides: &[(&'static str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("delivery-backend")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert!(!settings.in_memory);
        assert_eq!(
            settings.bind_addr().expect("default address"),
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().expect("literal")
        );
        assert_eq!(
            settings.maintenance_config().expect("defaults validate"),
            MaintenanceConfig::default()
        );
        assert_eq!(settings.storage(), Err(SettingsError::MissingDatabaseUrl));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("DELIVERY_DATABASE_URL", "postgres://localhost/delivery"),
            ("DELIVERY_POOL_MAX_SIZE", "4"),
            ("DELIVERY_UNCONFIRMED_TIMEOUT_MINUTES", "15"),
            ("DELIVERY_SWEEP_BATCH_SIZE", "50"),
            ("DELIVERY_EXPIRE_AVAILABILITY_EVERY_SECS", "30"),
        ]));

        let settings = load_from_empty_args();
        let config = settings.maintenance_config().expect("valid overrides");
        assert_eq!(config.unconfirmed_timeout, TimeDelta::minutes(15));
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.expire_availability_every, Duration::from_secs(30));
        assert_eq!(config.archive_after, TimeDelta::days(90));
        assert_eq!(
            settings.storage().expect("postgres selected"),
            StorageBackend::Postgres {
                database_url: "postgres://localhost/delivery".to_owned(),
                pool_max_size: 4,
            }
        );
    }

    #[rstest]
    fn in_memory_needs_no_database_url() {
        let _guard = lock_env(env_with(&[("DELIVERY_IN_MEMORY", "true")]));

        let settings = load_from_empty_args();
        assert_eq!(settings.storage(), Ok(StorageBackend::InMemory));
    }

    #[rstest]
    #[case("DELIVERY_SWEEP_BATCH_SIZE", "0")]
    #[case("DELIVERY_UNCONFIRMED_TIMEOUT_MINUTES", "-5")]
    #[case("DELIVERY_EXPIRE_UNCONFIRMED_EVERY_SECS", "0")]
    fn non_positive_sweep_settings_are_rejected(#[case] var: &'static str, #[case] value: &str) {
        let _guard = lock_env(env_with(&[(var, value)]));

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.maintenance_config(),
            Err(SettingsError::Maintenance(
                MaintenanceConfigError::NotPositive { .. }
            ))
        ));
    }

    #[rstest]
    fn malformed_bind_address_is_reported() {
        let _guard = lock_env(env_with(&[("DELIVERY_BIND_ADDR", "localhost")]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr(),
            Err(SettingsError::InvalidBindAddr {
                value: "localhost".to_owned()
            })
        );
    }
}
