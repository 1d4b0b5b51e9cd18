//! Configuration management for the storefront client.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::api::{ApiError, Credentials, HttpStorefrontApi};
use crate::checkout::{DEFAULT_CHECKOUT_TIMEOUT, ShippingPolicy};
use crate::notifications::{DEFAULT_ORDER_REFRESH_DELAY, DEFAULT_POLL_INTERVAL, PollingStrategy};
use crate::types::Money;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default backend base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("invalid value for {name}: '{value}' ({reason})")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
        /// What was expected
        reason: &'static str,
    },

    /// The API URL is not an http(s) URL
    #[error("STOREFRONT_API_URL must start with http:// or https://, got '{0}'")]
    InvalidApiUrl(String),
}

/// Storefront client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    /// Backend base URL (`STOREFRONT_API_URL`)
    pub api_url: String,
    /// Notification refresh cadence (`STOREFRONT_POLL_INTERVAL_SECS`, 0 = manual)
    pub polling: PollingStrategy,
    /// Wait between an order and its notification refresh (`STOREFRONT_ORDER_REFRESH_DELAY_MS`)
    pub order_refresh_delay: Duration,
    /// Per-request HTTP timeout (`STOREFRONT_REQUEST_TIMEOUT_SECS`, unset = none)
    pub request_timeout: Option<Duration>,
    /// Upper bound on one checkout submission (`STOREFRONT_CHECKOUT_TIMEOUT_SECS`)
    pub checkout_timeout: Duration,
    /// Shipping fee rules (`STOREFRONT_SHIPPING_FEE`, `STOREFRONT_FREE_SHIPPING_THRESHOLD`)
    pub shipping: ShippingPolicy,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            polling: PollingStrategy::Interval(DEFAULT_POLL_INTERVAL),
            order_refresh_delay: DEFAULT_ORDER_REFRESH_DELAY,
            request_timeout: None,
            checkout_timeout: DEFAULT_CHECKOUT_TIMEOUT,
            shipping: ShippingPolicy::default(),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`; unset variables take their defaults
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let defaults = Self::default();

        let api_url = vars
            .raw("STOREFRONT_API_URL")
            .unwrap_or(defaults.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }

        let polling = match vars.parse::<u64>("STOREFRONT_POLL_INTERVAL_SECS", "whole seconds")? {
            Some(0) => PollingStrategy::Manual,
            Some(secs) => PollingStrategy::Interval(Duration::from_secs(secs)),
            None => defaults.polling,
        };

        let order_refresh_delay = vars
            .parse::<u64>("STOREFRONT_ORDER_REFRESH_DELAY_MS", "whole milliseconds")?
            .map_or(defaults.order_refresh_delay, Duration::from_millis);

        let request_timeout = vars
            .parse::<u64>("STOREFRONT_REQUEST_TIMEOUT_SECS", "whole seconds")?
            .map(Duration::from_secs);

        let checkout_timeout = match vars
            .parse::<u64>("STOREFRONT_CHECKOUT_TIMEOUT_SECS", "whole seconds")?
        {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    name: "STOREFRONT_CHECKOUT_TIMEOUT_SECS",
                    value: "0".to_string(),
                    reason: "must be positive",
                });
            },
            Some(secs) => Duration::from_secs(secs),
            None => defaults.checkout_timeout,
        };

        let shipping = ShippingPolicy {
            flat_fee: vars
                .money("STOREFRONT_SHIPPING_FEE")?
                .unwrap_or(defaults.shipping.flat_fee),
            free_shipping_threshold: vars.money("STOREFRONT_FREE_SHIPPING_THRESHOLD")?,
        };

        Ok(Self {
            api_url,
            polling,
            order_refresh_delay,
            request_timeout,
            checkout_timeout,
            shipping,
        })
    }

    /// HTTP client for this configuration
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn api_client(&self, credentials: Credentials) -> Result<HttpStorefrontApi, ApiError> {
        HttpStorefrontApi::with_timeout(&self.api_url, credentials, self.request_timeout)
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed value; blank counts as unset
    fn raw(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(
        &self,
        name: &'static str,
        reason: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        self.raw(name)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue { name, value, reason })
            })
            .transpose()
    }

    fn money(&self, name: &'static str) -> Result<Option<Money>, ConfigError> {
        let Some(amount) = self.parse::<Decimal>(name, "a decimal amount")? else {
            return Ok(None);
        };
        if amount.is_sign_negative() {
            return Err(ConfigError::InvalidValue {
                name,
                value: amount.to_string(),
                reason: "must not be negative",
            });
        }
        Ok(Some(Money::new(amount)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(load(&[]), Ok(StorefrontConfig::default()));
    }

    #[test]
    fn reads_every_variable() {
        let config = load(&[
            ("STOREFRONT_API_URL", "https://shop.example.ph/api"),
            ("STOREFRONT_POLL_INTERVAL_SECS", "10"),
            ("STOREFRONT_ORDER_REFRESH_DELAY_MS", "250"),
            ("STOREFRONT_REQUEST_TIMEOUT_SECS", "5"),
            ("STOREFRONT_CHECKOUT_TIMEOUT_SECS", "12"),
            ("STOREFRONT_SHIPPING_FEE", "80"),
            ("STOREFRONT_FREE_SHIPPING_THRESHOLD", "1500.00"),
        ]);

        assert_eq!(
            config,
            Ok(StorefrontConfig {
                api_url: "https://shop.example.ph/api".to_string(),
                polling: PollingStrategy::Interval(Duration::from_secs(10)),
                order_refresh_delay: Duration::from_millis(250),
                request_timeout: Some(Duration::from_secs(5)),
                checkout_timeout: Duration::from_secs(12),
                shipping: ShippingPolicy {
                    flat_fee: Money::from_major(80),
                    free_shipping_threshold: Some(Money::from_major(1500)),
                },
            })
        );
    }

    #[test]
    fn zero_poll_interval_means_manual() {
        let config = load(&[("STOREFRONT_POLL_INTERVAL_SECS", "0")]);
        assert_eq!(config.map(|c| c.polling), Ok(PollingStrategy::Manual));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("STOREFRONT_API_URL", "  "), ("STOREFRONT_SHIPPING_FEE", "")]);
        assert_eq!(config, Ok(StorefrontConfig::default()));
    }

    #[test]
    fn rejects_non_http_url() {
        assert_eq!(
            load(&[("STOREFRONT_API_URL", "ftp://files")]),
            Err(ConfigError::InvalidApiUrl("ftp://files".to_string()))
        );
    }

    #[test]
    fn rejects_garbage_numbers() {
        let error = load(&[("STOREFRONT_POLL_INTERVAL_SECS", "soon")]);
        assert!(matches!(
            error,
            Err(ConfigError::InvalidValue {
                name: "STOREFRONT_POLL_INTERVAL_SECS",
                ..
            })
        ));
    }

    #[test]
    fn rejects_negative_fee_and_zero_checkout_timeout() {
        assert!(load(&[("STOREFRONT_SHIPPING_FEE", "-1")]).is_err());
        assert!(load(&[("STOREFRONT_CHECKOUT_TIMEOUT_SECS", "0")]).is_err());
    }
}
