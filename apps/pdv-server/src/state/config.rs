//! # Configuration State
//!
//! Business settings loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`PDV_*`)
//! 2. Defaults (this file)
//!
//! Company info printed on receipts and budgets is not here: it is edited
//! from the UI and lives in the local store under `"company"`.
//!
//! ## Thread Safety
//! Read-only after initialization, so no mutex is needed.

use serde::{Deserialize, Serialize};

use pdv_core::{Money, DEFAULT_BUDGET_VALIDITY_DAYS, DEFAULT_MIN_STOCK};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigState {
    /// Shown in the UI header.
    pub store_name: String,

    /// ISO 4217.
    pub currency_code: String,

    pub currency_symbol: String,

    /// Minimum stock given to new products that don't set one.
    pub default_min_stock: i64,

    /// Days a budget stays valid when no `valid_until` is given.
    pub budget_validity_days: i64,
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState {
            store_name: "PDV".to_string(),
            currency_code: "BRL".to_string(),
            currency_symbol: "R$".to_string(),
            default_min_stock: DEFAULT_MIN_STOCK,
            budget_validity_days: DEFAULT_BUDGET_VALIDITY_DAYS,
        }
    }
}

impl ConfigState {
    /// Defaults overridden by environment variables.
    ///
    /// ## Environment Variables
    /// - `PDV_STORE_NAME`
    /// - `PDV_DEFAULT_MIN_STOCK`: non-negative integer
    /// - `PDV_BUDGET_VALIDITY_DAYS`: positive integer
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(store_name) = lookup("PDV_STORE_NAME") {
            config.store_name = store_name;
        }

        if let Some(raw) = lookup("PDV_DEFAULT_MIN_STOCK") {
            match raw.parse::<i64>() {
                Ok(n) if n >= 0 => config.default_min_stock = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid PDV_DEFAULT_MIN_STOCK"),
            }
        }

        if let Some(raw) = lookup("PDV_BUDGET_VALIDITY_DAYS") {
            match raw.parse::<i64>() {
                Ok(n) if n > 0 => config.budget_validity_days = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid PDV_BUDGET_VALIDITY_DAYS"),
            }
        }

        config
    }

    /// Formats centavos the Brazilian way.
    ///
    /// ```rust,ignore
    /// assert_eq!(ConfigState::default().format_currency(123456), "R$ 1.234,56");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        Money::from_cents(cents).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigState::default();
        assert_eq!(config.currency_code, "BRL");
        assert_eq!(config.default_min_stock, DEFAULT_MIN_STOCK);
        assert_eq!(config.budget_validity_days, DEFAULT_BUDGET_VALIDITY_DAYS);
        assert_eq!(config.format_currency(1050), "R$ 10,50");
    }

    #[test]
    fn test_overrides_ignore_bad_numbers() {
        let config = ConfigState::from_lookup(|key| match key {
            "PDV_STORE_NAME" => Some("Gesso Forte".to_string()),
            "PDV_DEFAULT_MIN_STOCK" => Some("5".to_string()),
            "PDV_BUDGET_VALIDITY_DAYS" => Some("-3".to_string()),
            _ => None,
        });
        assert_eq!(config.store_name, "Gesso Forte");
        assert_eq!(config.default_min_stock, 5);
        assert_eq!(config.budget_validity_days, DEFAULT_BUDGET_VALIDITY_DAYS);
    }
}
