//! Controller configuration from environment variables.

use crate::error::ControllerError;
use lifecycle::LifecycleConfig;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_COMMISSIONING_TIMEOUT_MINUTES: u64 = 60;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;
const DEFAULT_PROBE_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Namespace holding Machine and MacLink resources
    pub namespace: String,
    pub commissioning_timeout_minutes: u64,
    pub sweep_interval: Duration,
    pub probe_addr: SocketAddr,
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let namespace = lookup("WATCH_NAMESPACE")
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let commissioning_timeout_minutes = positive(
            "COMMISSIONING_TIMEOUT_MINUTES",
            lookup("COMMISSIONING_TIMEOUT_MINUTES"),
            DEFAULT_COMMISSIONING_TIMEOUT_MINUTES,
        )?;
        let sweep_interval = Duration::from_secs(positive(
            "SWEEP_INTERVAL_SECONDS",
            lookup("SWEEP_INTERVAL_SECONDS"),
            DEFAULT_SWEEP_INTERVAL_SECONDS,
        )?);
        let probe_addr = lookup("PROBE_ADDR")
            .unwrap_or_else(|| DEFAULT_PROBE_ADDR.to_string());
        let probe_addr = probe_addr.parse().map_err(|_| {
            ControllerError::InvalidConfig(format!(
                "PROBE_ADDR must be a socket address, got '{probe_addr}'"
            ))
        })?;

        Ok(Self {
            namespace,
            commissioning_timeout_minutes,
            sweep_interval,
            probe_addr,
        })
    }

    /// Tunables for the lifecycle core
    pub fn lifecycle(&self) -> Result<LifecycleConfig, ControllerError> {
        let minutes = i64::try_from(self.commissioning_timeout_minutes).map_err(|_| {
            ControllerError::InvalidConfig("COMMISSIONING_TIMEOUT_MINUTES is too large".to_string())
        })?;
        Ok(LifecycleConfig {
            commissioning_timeout: chrono::Duration::minutes(minutes),
            ..LifecycleConfig::default()
        })
    }
}

fn positive(key: &str, value: Option<String>, default: u64) -> Result<u64, ControllerError> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.commissioning_timeout_minutes, 60);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.probe_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(
            config.lifecycle().unwrap().commissioning_timeout,
            chrono::Duration::minutes(60)
        );
    }

    #[test]
    fn test_overrides() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", "fleet"),
            ("COMMISSIONING_TIMEOUT_MINUTES", "15"),
            ("SWEEP_INTERVAL_SECONDS", "5"),
            ("PROBE_ADDR", "127.0.0.1:9090"),
        ]))
        .unwrap();
        assert_eq!(config.namespace, "fleet");
        assert_eq!(config.commissioning_timeout_minutes, 15);
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.probe_addr.port(), 9090);
    }

    #[test]
    fn test_invalid_values() {
        for vars in [
            [("COMMISSIONING_TIMEOUT_MINUTES", "0")],
            [("SWEEP_INTERVAL_SECONDS", "soon")],
            [("PROBE_ADDR", "localhost")],
        ] {
            assert!(matches!(
                ControllerConfig::from_lookup(lookup(&vars)),
                Err(ControllerError::InvalidConfig(_))
            ));
        }
    }
}
