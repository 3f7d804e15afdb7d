// Application configuration
// Built once at startup from the process environment (after `.env` is loaded)

use std::str::FromStr;

use crate::loyalty::LoyaltyConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Invalid loyalty configuration: {0}")]
    Loyalty(String),
}

/// Outbound order notification settings
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationConfig {
    /// When unset, confirmations are only written to the log
    pub webhook_url: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub database_max_connections: u32,
    pub notifications: NotificationConfig,
    pub loyalty: LoyaltyConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let defaults = LoyaltyConfig::default();

        let loyalty = LoyaltyConfig {
            silver_min_points: parse_or(&get, "LOYALTY_SILVER_MIN_POINTS", defaults.silver_min_points)?,
            gold_min_points: parse_or(&get, "LOYALTY_GOLD_MIN_POINTS", defaults.gold_min_points)?,
            platinum_min_points: parse_or(&get, "LOYALTY_PLATINUM_MIN_POINTS", defaults.platinum_min_points)?,
            bronze_rate: parse_or(&get, "LOYALTY_BRONZE_RATE", defaults.bronze_rate)?,
            silver_rate: parse_or(&get, "LOYALTY_SILVER_RATE", defaults.silver_rate)?,
            gold_rate: parse_or(&get, "LOYALTY_GOLD_RATE", defaults.gold_rate)?,
            platinum_rate: parse_or(&get, "LOYALTY_PLATINUM_RATE", defaults.platinum_rate)?,
            reward_expiration_months: parse_or(&get, "REWARD_EXPIRATION_MONTHS", defaults.reward_expiration_months)?,
            auto_settle_on_delivery: parse_or(&get, "AUTO_SETTLE_ON_DELIVERY", defaults.auto_settle_on_delivery)?,
        };
        loyalty.validate().map_err(ConfigError::Loyalty)?;

        Ok(Self {
            database_url,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 8080u16)?,
            database_max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5u32)?,
            notifications: NotificationConfig {
                webhook_url: get("NOTIFICATION_WEBHOOK_URL"),
                from: get("NOTIFICATION_FROM").unwrap_or_else(|| "no-reply@shop.local".to_string()),
            },
            loyalty,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/shop")])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.notifications.webhook_url, None);
        assert_eq!(config.loyalty, LoyaltyConfig::default());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("PORT", "9000"),
            ("LOYALTY_SILVER_RATE", "0.025"),
            ("REWARD_EXPIRATION_MONTHS", "6"),
            ("AUTO_SETTLE_ON_DELIVERY", "false"),
            ("NOTIFICATION_WEBHOOK_URL", "http://mailer.internal/hooks/orders"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.loyalty.silver_rate, dec!(0.025));
        assert_eq!(config.loyalty.reward_expiration_months, 6);
        assert!(!config.loyalty.auto_settle_on_delivery);
        assert_eq!(
            config.notifications.webhook_url.as_deref(),
            Some("http://mailer.internal/hooks/orders")
        );
    }

    #[test]
    fn test_unparseable_value() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_non_monotonic_thresholds_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("LOYALTY_GOLD_MIN_POINTS", "500"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Loyalty(_)));
    }
}
