use std::env;

use log::*;
use soko_common::{Money, Secret};
use soko_engine::{DeliveryFees, PricingConfig};

const DEFAULT_SOKO_HOST: &str = "127.0.0.1";
const DEFAULT_SOKO_PORT: u16 = 8360;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub pricing: PricingConfig,
    pub delivery_fees: DeliveryFees,
    pub daraja: DarajaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SOKO_HOST.to_string(),
            port: DEFAULT_SOKO_PORT,
            database_url: String::default(),
            pricing: PricingConfig::default(),
            delivery_fees: DeliveryFees::default(),
            daraja: DarajaConfig::default(),
        }
    }
}

/// Credentials and endpoints for Safaricom's Daraja API. The secrets never appear in logs; [`Secret`] masks
/// them in Debug output.
#[derive(Clone, Debug, Default)]
pub struct DarajaConfig {
    /// e.g. `https://sandbox.safaricom.co.ke`
    pub base_url: String,
    pub business_short_code: String,
    pub passkey: Secret<String>,
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
    /// The publicly reachable URL Safaricom will POST the STK result to. Must route to
    /// `/payments/mpesa/callback` on this server.
    pub callback_url: String,
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SOKO_HOST").ok().unwrap_or_else(|| DEFAULT_SOKO_HOST.into());
        let port = env::var("SOKO_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("{s} is not a valid port for SOKO_PORT. {e} Using the default instead.");
                    DEFAULT_SOKO_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SOKO_PORT);
        let database_url = env::var("SOKO_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("SOKO_DATABASE_URL is not set. Using the default sqlite database.");
            "sqlite://data/soko_store.db".to_string()
        });
        let pricing = PricingConfig { service_fee: money_from_env("SOKO_SERVICE_FEE", 50) };
        let delivery_fees = DeliveryFees {
            retail: money_from_env("SOKO_RETAIL_DELIVERY_FEE", 200),
            bulk: money_from_env("SOKO_BULK_DELIVERY_FEE", 500),
        };
        let daraja = DarajaConfig::from_env_or_default();
        Self { host, port, database_url, pricing, delivery_fees, daraja }
    }
}

impl DarajaConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = env::var("MPESA_BASE_URL").ok().unwrap_or_else(|| {
            warn!("MPESA_BASE_URL is not set. Defaulting to the Daraja sandbox.");
            "https://sandbox.safaricom.co.ke".to_string()
        });
        let business_short_code = env::var("MPESA_SHORT_CODE").ok().unwrap_or_else(|| {
            warn!("MPESA_SHORT_CODE is not set. STK pushes will be rejected by the gateway.");
            String::default()
        });
        let passkey = Secret::new(env::var("MPESA_PASSKEY").ok().unwrap_or_else(|| {
            warn!("MPESA_PASSKEY is not set. STK pushes will be rejected by the gateway.");
            String::default()
        }));
        let consumer_key = env::var("MPESA_CONSUMER_KEY").ok().unwrap_or_default();
        let consumer_secret = Secret::new(env::var("MPESA_CONSUMER_SECRET").ok().unwrap_or_default());
        let callback_url = env::var("MPESA_CALLBACK_URL").ok().unwrap_or_else(|| {
            warn!("MPESA_CALLBACK_URL is not set. Payment results will never reach this server.");
            String::default()
        });
        Self { base_url, business_short_code, passkey, consumer_key, consumer_secret, callback_url }
    }
}

fn money_from_env(var: &str, default: i64) -> Money {
    env::var(var)
        .ok()
        .and_then(|s| {
            s.parse::<i64>()
                .map_err(|e| {
                    error!("{s} is not a valid amount for {var}. {e} Using the default instead.");
                    e
                })
                .ok()
        })
        .map(Money::from)
        .unwrap_or_else(|| Money::from(default))
}
