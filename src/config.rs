use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use thiserror::Error;

use crate::domain::monitor::MonitorThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable '{0}'")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub db_pool_size: u32,
    pub db_connection_timeout: Duration,
    /// Per-request timeout for storefront API calls.
    pub connector_timeout: Duration,
    pub proof_ttl: chrono::Duration,
    pub critical_sweep_interval: Duration,
    pub full_sweep_interval: Duration,
    /// Used until an admin override has been persisted.
    pub default_thresholds: MonitorThresholds,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&get, "PORT", 8080u16)?;

        let defaults = MonitorThresholds::default();
        let default_thresholds = MonitorThresholds {
            unassigned_order_hours: parse_or(
                &get,
                "SLA_UNASSIGNED_ORDER_HOURS",
                defaults.unassigned_order_hours,
            )?,
            assigned_but_not_accepted_hours: parse_or(
                &get,
                "SLA_ASSIGNED_NOT_ACCEPTED_HOURS",
                defaults.assigned_but_not_accepted_hours,
            )?,
            accepted_but_not_started_hours: parse_or(
                &get,
                "SLA_ACCEPTED_NOT_STARTED_HOURS",
                defaults.accepted_but_not_started_hours,
            )?,
            in_progress_too_long_days: parse_or(
                &get,
                "SLA_IN_PROGRESS_TOO_LONG_DAYS",
                defaults.in_progress_too_long_days,
            )?,
            no_tracking_after_days: parse_or(
                &get,
                "SLA_NO_TRACKING_AFTER_DAYS",
                defaults.no_tracking_after_days,
            )?,
            stale_tracking_days: parse_or(
                &get,
                "SLA_STALE_TRACKING_DAYS",
                defaults.stale_tracking_days,
            )?,
        };
        default_thresholds
            .validate()
            .map_err(|e| ConfigError::Invalid {
                name: "SLA_*",
                value: format!("{:?}", default_thresholds),
                reason: e.to_string(),
            })?;

        let config = Self {
            database_url,
            host,
            port,
            db_pool_size: positive(&get, "DB_POOL_SIZE", 10)?,
            db_connection_timeout: Duration::from_secs(positive(
                &get,
                "DB_CONNECTION_TIMEOUT_SECS",
                30,
            )?),
            connector_timeout: Duration::from_secs(positive(&get, "CONNECTOR_TIMEOUT_SECS", 30)?),
            proof_ttl: chrono::Duration::days(positive(&get, "PROOF_TTL_DAYS", 7)?),
            critical_sweep_interval: Duration::from_secs(positive(
                &get,
                "MONITOR_CRITICAL_INTERVAL_SECS",
                3600,
            )?),
            full_sweep_interval: Duration::from_secs(positive(
                &get,
                "MONITOR_FULL_INTERVAL_SECS",
                86_400,
            )?),
            default_thresholds,
        };
        log::info!("Application configuration loaded successfully.");
        Ok(config)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&'static str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn positive<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default + Copy,
    T::Err: std::fmt::Display,
    G: Fn(&'static str) -> Option<String>,
{
    let value = parse_or(get, name, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: get(name).unwrap_or_default(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/db")]).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.proof_ttl, chrono::Duration::days(7));
        assert_eq!(config.critical_sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.full_sweep_interval, Duration::from_secs(86_400));
        assert_eq!(config.default_thresholds, MonitorThresholds::default());
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = config_from(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn sla_overrides_are_read() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("SLA_UNASSIGNED_ORDER_HOURS", "6"),
            ("SLA_STALE_TRACKING_DAYS", "21"),
        ])
        .unwrap();

        assert_eq!(config.default_thresholds.unassigned_order_hours, 6);
        assert_eq!(config.default_thresholds.stale_tracking_days, 21);
        assert_eq!(config.default_thresholds.assigned_but_not_accepted_hours, 48);
    }

    #[test]
    fn non_positive_values_are_rejected() {
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("PROOF_TTL_DAYS", "0"),
        ])
        .is_err());
        assert!(config_from(&[
            ("DATABASE_URL", "postgres://localhost/db"),
            ("SLA_NO_TRACKING_AFTER_DAYS", "-1"),
        ])
        .is_err());
    }

    #[test]
    fn unparsable_port_names_the_variable() {
        let err = config_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
