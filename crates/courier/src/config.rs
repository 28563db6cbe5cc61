//! Service-wide configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use courier_dispatch::DispatchConfig;
use courier_session::{Notices, SessionConfig, SessionSecret};

use crate::ConfigError;

pub const ENV_SESSION_SECRET: &str = "COURIER_SESSION_SECRET";
pub const ENV_SESSION_TTL_SECS: &str = "COURIER_SESSION_TTL_SECS";
pub const ENV_TOKEN_LEEWAY_SECS: &str = "COURIER_TOKEN_LEEWAY_SECS";
pub const ENV_DISPATCH_CONCURRENCY: &str = "COURIER_DISPATCH_CONCURRENCY";
pub const ENV_SEND_TIMEOUT_SECS: &str = "COURIER_SEND_TIMEOUT_SECS";

/// Everything a [`Courier`](crate::Courier) needs to start.
#[derive(Debug, Clone)]
pub struct CourierConfig {
    pub secret: SessionSecret,
    pub session: SessionConfig,
    pub notices: Notices,
    pub dispatch: DispatchConfig,
    /// How often expired registrations and login codes are swept.
    /// Default: 60 seconds.
    pub sweep_interval: Duration,
}

impl CourierConfig {
    /// Defaults for everything except the secret, which has none.
    pub fn new(secret: SessionSecret) -> Self {
        Self {
            secret,
            session: SessionConfig::default(),
            notices: Notices::default(),
            dispatch: DispatchConfig::default(),
            sweep_interval: Duration::from_secs(60),
        }
    }

    /// Reads configuration from the process environment.
    ///
    /// `COURIER_SESSION_SECRET` is required. `COURIER_SESSION_TTL_SECS`,
    /// `COURIER_TOKEN_LEEWAY_SECS`, `COURIER_DISPATCH_CONCURRENCY` and
    /// `COURIER_SEND_TIMEOUT_SECS` override defaults when set. A send
    /// timeout of `0` disables the timeout.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through
    /// `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_secret = lookup(ENV_SESSION_SECRET)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(ENV_SESSION_SECRET))?;
        let mut config = Self::new(SessionSecret::new(raw_secret.into_bytes())?);

        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_SESSION_TTL_SECS)? {
            config.session.session_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_TOKEN_LEEWAY_SECS)? {
            config.session.leeway = Duration::from_secs(secs);
        }
        if let Some(max) = parse_var::<usize, _>(&lookup, ENV_DISPATCH_CONCURRENCY)? {
            if max == 0 {
                return Err(ConfigError::Invalid {
                    var: ENV_DISPATCH_CONCURRENCY,
                    reason: "must be at least 1".into(),
                });
            }
            config.dispatch.max_concurrency = max;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, ENV_SEND_TIMEOUT_SECS)? {
            config.dispatch.send_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    pub fn with_notices(mut self, notices: Notices) -> Self {
        self.notices = notices;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_sweep_interval(mut self, every: Duration) -> Self {
        self.sweep_interval = every;
        self
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = CourierConfig::from_lookup(lookup_from(&[(ENV_SESSION_SECRET, SECRET)])).unwrap();
        assert_eq!(config.session.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.dispatch.max_concurrency, 16);
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_from_lookup_missing_secret_returns_missing() {
        let result = CourierConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::Missing(ENV_SESSION_SECRET))));
    }

    #[test]
    fn test_from_lookup_short_secret_returns_session_error() {
        let result = CourierConfig::from_lookup(lookup_from(&[(ENV_SESSION_SECRET, "short")]));
        assert!(matches!(result, Err(ConfigError::Session(_))));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = CourierConfig::from_lookup(lookup_from(&[
            (ENV_SESSION_SECRET, SECRET),
            (ENV_SESSION_TTL_SECS, "3600"),
            (ENV_TOKEN_LEEWAY_SECS, "5"),
            (ENV_DISPATCH_CONCURRENCY, "4"),
            (ENV_SEND_TIMEOUT_SECS, "0"),
        ]))
        .unwrap();
        assert_eq!(config.session.session_ttl, Duration::from_secs(3600));
        assert_eq!(config.session.leeway, Duration::from_secs(5));
        assert_eq!(config.dispatch.max_concurrency, 4);
        assert_eq!(config.dispatch.send_timeout, None);
    }

    #[test]
    fn test_from_lookup_garbage_number_returns_invalid() {
        let result = CourierConfig::from_lookup(lookup_from(&[
            (ENV_SESSION_SECRET, SECRET),
            (ENV_SESSION_TTL_SECS, "a day"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { var: ENV_SESSION_TTL_SECS, .. })
        ));
    }

    #[test]
    fn test_from_lookup_zero_concurrency_returns_invalid() {
        let result = CourierConfig::from_lookup(lookup_from(&[
            (ENV_SESSION_SECRET, SECRET),
            (ENV_DISPATCH_CONCURRENCY, "0"),
        ]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
