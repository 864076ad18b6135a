//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use anyhow::{Context, bail};

use agrichain_core::{Address, Amount};
use agrichain_infra::SensorStoreConfig;
use agrichain_observability::LogFormat;

pub const BIND_ADDR_VAR: &str = "AGRICHAIN_BIND_ADDR";
pub const GENESIS_VAR: &str = "AGRICHAIN_GENESIS";
pub const ONLINE_WINDOW_VAR: &str = "SENSOR_ONLINE_WINDOW_SECS";
pub const HISTORY_LIMIT_VAR: &str = "SENSOR_HISTORY_LIMIT";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Balances credited once when the ledger starts.
    pub genesis: Vec<(Address, Amount)>,
    pub sensors: SensorStoreConfig,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            genesis: Vec::new(),
            sensors: SensorStoreConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Unset and blank variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = SensorStoreConfig::default();

        let bind_addr = get(BIND_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse()
            .with_context(|| format!("{BIND_ADDR_VAR} must be a socket address"))?;

        let genesis = match get(GENESIS_VAR) {
            Some(raw) => parse_genesis(&raw).with_context(|| format!("invalid {GENESIS_VAR}"))?,
            None => Vec::new(),
        };

        let online_window = match get(ONLINE_WINDOW_VAR) {
            Some(raw) => {
                let secs: u32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{ONLINE_WINDOW_VAR} must be a number of seconds"))?;
                chrono::Duration::seconds(i64::from(secs))
            }
            None => defaults.online_window,
        };

        let history_limit = match get(HISTORY_LIMIT_VAR) {
            Some(raw) => {
                let limit: usize = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{HISTORY_LIMIT_VAR} must be a positive integer"))?;
                if limit == 0 {
                    bail!("{HISTORY_LIMIT_VAR} must be a positive integer");
                }
                limit
            }
            None => defaults.history_limit,
        };

        let log_format = match get(LOG_FORMAT_VAR) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("invalid {LOG_FORMAT_VAR}"))?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            genesis,
            sensors: SensorStoreConfig {
                online_window,
                history_limit,
            },
            log_format,
        })
    }
}

/// `0xaddr=amount,0xaddr=amount`; amounts accept the `Amount` text forms.
fn parse_genesis(raw: &str) -> anyhow::Result<Vec<(Address, Amount)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (address, amount) = entry
                .split_once('=')
                .with_context(|| format!("entry {entry:?} is not of the form address=amount"))?;
            let address: Address = address.trim().parse()?;
            let amount: Amount = amount.trim().parse()?;
            Ok((address, amount))
        })
        .collect()
}
