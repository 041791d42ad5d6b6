use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::Level;
use url::Url;

use crate::amount::MAX_DECIMALS;
use crate::registry::{
    BASE_GATEWAY, ContractRegistry, DEFAULT_PARTNER_ID, RegistryError, VaultConfig, base_vaults,
};
use crate::transaction::{InvalidSlippage, SlippageBps};

const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 1;

#[derive(Parser, Debug, Clone)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[clap(long, env = "NUMU_CONFIG")]
    pub config: PathBuf,
    /// Path to TOML secrets file holding the signer key
    #[clap(long, env = "NUMU_SECRETS")]
    pub secrets: Option<PathBuf>,
}

/// Non-secret settings deserialized from the plaintext config TOML.
#[derive(Deserialize)]
struct Config {
    rpc_url: Url,
    log_level: Option<LogLevel>,
    slippage_bps: Option<u16>,
    partner_id: Option<u32>,
    required_confirmations: Option<u64>,
    gateway: Option<Address>,
    vaults: Option<Vec<VaultConfig>>,
}

/// Secret credentials deserialized from the secrets TOML.
#[derive(Deserialize)]
struct Secrets {
    private_key: B256,
}

/// Runtime context assembled from the plaintext config and the optional
/// secrets file.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub log_level: LogLevel,
    pub rpc_url: Url,
    pub slippage: SlippageBps,
    pub required_confirmations: u64,
    pub registry: ContractRegistry,
    signer: Option<PrivateKeySigner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

impl From<&LogLevel> for Level {
    fn from(log_level: &LogLevel) -> Self {
        (*log_level).into()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    InvalidSlippage(#[from] InvalidSlippage),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("{token} has {decimals} decimals, at most 18 are supported")]
    UnsupportedDecimals { token: String, decimals: u8 },
    #[error("failed to derive signer from private_key")]
    PrivateKey(#[source] alloy::signers::k256::ecdsa::Error),
    #[error("a secrets file with private_key is required to sign transactions")]
    MissingSigner,
}

impl ConfigError {
    /// Short, secret-free description for exit messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "failed to read config file",
            Self::Toml(_) => "failed to parse TOML",
            Self::InvalidSlippage(_) => "invalid slippage tolerance",
            Self::Registry(_) => "invalid vault registry",
            Self::UnsupportedDecimals { .. } => "unsupported token decimals",
            Self::PrivateKey(_) => "invalid private key",
            Self::MissingSigner => "missing signer secrets",
        }
    }
}

impl Ctx {
    pub fn load_files(config: &Path, secrets: Option<&Path>) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(config)?;
        let secrets_str = secrets.map(std::fs::read_to_string).transpose()?;
        Self::from_toml(&config_str, secrets_str.as_deref())
    }

    pub fn from_toml(config_toml: &str, secrets_toml: Option<&str>) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;
        let secrets: Option<Secrets> = secrets_toml.map(toml::from_str).transpose()?;

        let slippage = config
            .slippage_bps
            .map(SlippageBps::new)
            .transpose()?
            .unwrap_or_default();

        let vaults = config.vaults.unwrap_or_else(base_vaults);
        for vault in &vaults {
            check_decimals(&vault.symbol, vault.decimals)?;
            check_decimals(&vault.asset.symbol, vault.asset.decimals)?;
        }

        let registry = ContractRegistry::new(
            config.gateway.unwrap_or(BASE_GATEWAY),
            config.partner_id.unwrap_or(DEFAULT_PARTNER_ID),
            vaults,
        )?;

        let signer = secrets
            .map(|secrets| {
                PrivateKeySigner::from_bytes(&secrets.private_key).map_err(ConfigError::PrivateKey)
            })
            .transpose()?;

        Ok(Self {
            log_level: config.log_level.unwrap_or(LogLevel::Info),
            rpc_url: config.rpc_url,
            slippage,
            required_confirmations: config
                .required_confirmations
                .unwrap_or(DEFAULT_REQUIRED_CONFIRMATIONS),
            registry,
            signer,
        })
    }

    /// The configured signer, required for anything that sends a
    /// transaction.
    pub fn signer(&self) -> Result<&PrivateKeySigner, ConfigError> {
        self.signer.as_ref().ok_or(ConfigError::MissingSigner)
    }
}

fn check_decimals(token: &str, decimals: u8) -> Result<(), ConfigError> {
    if decimals > MAX_DECIMALS {
        return Err(ConfigError::UnsupportedDecimals {
            token: token.to_string(),
            decimals,
        });
    }

    Ok(())
}

pub fn setup_tracing(log_level: &LogLevel) {
    let level: Level = log_level.into();
    let default_filter = format!("numu_takeaway={level},numu_evm={level},numu={level}");

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
