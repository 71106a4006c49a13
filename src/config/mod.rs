use std::env;

use crate::entitlement::oracle::ProductId;

/// Number of free scans permitted per calendar day when no entitlement
/// applies.
pub const FREE_DAILY_LIMIT: u32 = 2;

/// Top-level configuration handed to the core by the embedding app shell.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telemetry: TelemetryConfig,
    pub quota: QuotaConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let log_level = env::var("LABELSCAN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let free_daily_limit = match env::var("LABELSCAN_FREE_DAILY_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidFreeDailyLimit { value: raw })?,
            Err(_) => FREE_DAILY_LIMIT,
        };

        Ok(Self {
            telemetry: TelemetryConfig { log_level },
            quota: QuotaConfig {
                free_daily_limit,
                ..QuotaConfig::default()
            },
        })
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Quota and storefront knobs. Kept as configuration so limits and pack
/// denominations never appear as literals inside the gate logic.
#[derive(Debug, Clone)]
pub struct QuotaConfig {
    pub free_daily_limit: u32,
    /// Non-consumable product granting unconditional scanning.
    pub premium_product: ProductId,
    /// Consumable products granting a fixed number of scan credits.
    pub credit_packs: Vec<CreditPack>,
}

/// Consumable scan allowance sold as a pack.
#[derive(Debug, Clone)]
pub struct CreditPack {
    pub product: ProductId,
    pub credits: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_daily_limit: FREE_DAILY_LIMIT,
            premium_product: ProductId("labelscan.premium.lifetime".to_string()),
            credit_packs: vec![CreditPack {
                product: ProductId("labelscan.credits.10".to_string()),
                credits: 10,
            }],
        }
    }
}

impl QuotaConfig {
    pub(crate) fn credits_for(&self, product: &ProductId) -> Option<u32> {
        self.credit_packs
            .iter()
            .find(|pack| &pack.product == product)
            .map(|pack| pack.credits)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("LABELSCAN_FREE_DAILY_LIMIT must be a non-negative integer, got '{value}'")]
    InvalidFreeDailyLimit { value: String },
}
