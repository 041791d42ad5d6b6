//! Contract addresses and vault descriptors for YO Protocol on Base.
//!
//! The registry is built once at startup (from the Base defaults or
//! from the config file) and handed to every component that needs an
//! address. Nothing in here is mutated after construction.

use std::collections::HashMap;

use alloy::primitives::{Address, address};
use serde::Deserialize;

/// YO gateway on Base.
pub const BASE_GATEWAY: Address = address!("0xF1EeE0957267b1A474323Ff9CfF7719E964969FA");

/// Attribution tag passed to the gateway. Zero means no partner.
pub const DEFAULT_PARTNER_ID: u32 = 0;

/// An ERC20 token the wallet holds or deposits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenConfig {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Token is the wrapped form of the chain's native coin (WETH).
    #[serde(default)]
    pub wraps_native: bool,
}

/// A YO vault. The vault contract is itself the ERC20 share token.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VaultConfig {
    /// Short lookup key used on the command line (e.g. `yousd`).
    pub key: String,
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub asset: TokenConfig,
}

impl VaultConfig {
    /// Token description of the vault's own share token.
    pub fn share_token(&self) -> TokenConfig {
        TokenConfig {
            address: self.address,
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            wraps_native: false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown vault: {0}")]
    UnknownVault(String),
    #[error("duplicate vault key: {0}")]
    DuplicateKey(String),
    #[error("duplicate vault address: {0}")]
    DuplicateAddress(Address),
    #[error("no vaults configured")]
    Empty,
}

/// Gateway address, partner id and the table of supported vaults.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    gateway: Address,
    partner_id: u32,
    vaults: Vec<VaultConfig>,
    by_key: HashMap<String, usize>,
    by_address: HashMap<Address, usize>,
}

impl ContractRegistry {
    pub fn new(
        gateway: Address,
        partner_id: u32,
        vaults: Vec<VaultConfig>,
    ) -> Result<Self, RegistryError> {
        if vaults.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut by_key = HashMap::with_capacity(vaults.len());
        let mut by_address = HashMap::with_capacity(vaults.len());

        for (index, vault) in vaults.iter().enumerate() {
            let key = vault.key.to_ascii_lowercase();
            if by_key.insert(key, index).is_some() {
                return Err(RegistryError::DuplicateKey(vault.key.clone()));
            }
            if by_address.insert(vault.address, index).is_some() {
                return Err(RegistryError::DuplicateAddress(vault.address));
            }
        }

        Ok(Self {
            gateway,
            partner_id,
            vaults,
            by_key,
            by_address,
        })
    }

    /// yoUSD, yoETH and yoBTC on Base behind the production gateway.
    pub fn base() -> Self {
        let vaults = base_vaults();
        let by_key = vaults
            .iter()
            .enumerate()
            .map(|(index, vault)| (vault.key.clone(), index))
            .collect();
        let by_address = vaults
            .iter()
            .enumerate()
            .map(|(index, vault)| (vault.address, index))
            .collect();

        Self {
            gateway: BASE_GATEWAY,
            partner_id: DEFAULT_PARTNER_ID,
            vaults,
            by_key,
            by_address,
        }
    }

    pub fn gateway(&self) -> Address {
        self.gateway
    }

    pub fn partner_id(&self) -> u32 {
        self.partner_id
    }

    pub fn vaults(&self) -> &[VaultConfig] {
        &self.vaults
    }

    /// Looks up a vault by its key, ignoring ASCII case.
    pub fn vault(&self, key: &str) -> Result<&VaultConfig, RegistryError> {
        self.by_key
            .get(&key.to_ascii_lowercase())
            .map(|&index| &self.vaults[index])
            .ok_or_else(|| RegistryError::UnknownVault(key.to_string()))
    }

    pub fn vault_by_address(&self, address: &Address) -> Option<&VaultConfig> {
        self.by_address.get(address).map(|&index| &self.vaults[index])
    }
}

/// Vault table behind [`ContractRegistry::base`].
pub fn base_vaults() -> Vec<VaultConfig> {
    vec![
        VaultConfig {
            key: "yousd".to_string(),
            address: address!("0x0000000f2eb9f69274678c76222b35eec7588a65"),
            name: "yoUSD".to_string(),
            symbol: "yoUSD".to_string(),
            decimals: 6,
            asset: TokenConfig {
                address: address!("0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
                name: "USD Coin".to_string(),
                symbol: "USDC".to_string(),
                decimals: 6,
                wraps_native: false,
            },
        },
        VaultConfig {
            key: "yoeth".to_string(),
            address: address!("0x3a43aec53490cb9fa922847385d82fe25d0e9de7"),
            name: "yoETH".to_string(),
            symbol: "yoETH".to_string(),
            decimals: 18,
            asset: TokenConfig {
                address: address!("0x4200000000000000000000000000000000000006"),
                name: "Wrapped Ether".to_string(),
                symbol: "WETH".to_string(),
                decimals: 18,
                wraps_native: true,
            },
        },
        VaultConfig {
            key: "yobtc".to_string(),
            address: address!("0xbcbc8cb4d1e8ed048a6276a5e94a3e952660bcbc"),
            name: "yoBTC".to_string(),
            symbol: "yoBTC".to_string(),
            decimals: 8,
            asset: TokenConfig {
                address: address!("0xcbb7c0000ab88b473b1f5afd9ef808440eed33bf"),
                name: "Coinbase Wrapped BTC".to_string(),
                symbol: "cbBTC".to_string(),
                decimals: 8,
                wraps_native: false,
            },
        },
    ]
}
