//! EVM chain interaction abstraction.
//!
//! This crate provides two traits for interacting with EVM chains:
//!
//! - [`Evm`] - read-only chain access: raw `eth_call`, native balance
//!   lookups and a typed [`Evm::view`] helper that ABI-encodes a
//!   `sol!` call and decodes its return value.
//!
//! - [`Wallet`] - extends `Evm` with a signing identity and
//!   transaction submission, split into [`Wallet::broadcast`] and
//!   [`Wallet::confirm`] so callers can observe the gap between a
//!   transaction leaving the wallet and being mined.
//!
//! Revert data is decoded into human-readable reasons by both the view
//! and the submission paths of [`ProviderEvm`] and [`PrivateKeyWallet`].

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;

pub mod error_decoding;
mod local;
mod provider;

pub use local::PrivateKeyWallet;
pub use provider::ProviderEvm;

/// Errors that can occur during EVM operations.
#[derive(Debug, thiserror::Error)]
pub enum EvmError {
    #[error("transaction error: {0}")]
    Transaction(#[from] alloy::providers::PendingTransactionError),
    #[error("transport error: {0}")]
    Transport(#[from] alloy::transports::RpcError<alloy::transports::TransportErrorKind>),
    #[error("contract error: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("execution reverted: {0}")]
    Revert(String),
    #[error("transaction reverted: {tx_hash}")]
    Reverted { tx_hash: TxHash },
    #[error("failed to decode call output: {0}")]
    AbiDecode(#[from] alloy::sol_types::Error),
}

/// Read-only EVM chain access.
///
/// Implementations supply raw `eth_call` and native balance lookups;
/// [`view`](Evm::view) layers `sol!` call encoding on top.
#[async_trait]
pub trait Evm: Send + Sync + 'static {
    /// Execute `eth_call` against `contract` with the given calldata.
    ///
    /// On revert, implementations decode the Solidity error into
    /// [`EvmError::Revert`] when the revert data carries a reason.
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError>;

    /// Native coin balance of `owner` at the latest block.
    async fn native_balance(&self, owner: Address) -> Result<U256, EvmError>;

    /// Execute a typed view call and decode its return value.
    async fn view<C>(&self, contract: Address, call: C) -> Result<C::Return, EvmError>
    where
        C: SolCall + Send + Sync + 'static,
    {
        let output = self.call(contract, Bytes::from(call.abi_encode())).await?;
        Ok(C::abi_decode_returns(&output)?)
    }
}

/// Signing wallet on an EVM chain.
///
/// Extends [`Evm`] with a wallet identity (address) and transaction
/// submission. `broadcast` hands a signed transaction to the network and
/// returns as soon as it has a hash; `confirm` blocks until that
/// transaction is mined and fails if it reverted.
#[async_trait]
pub trait Wallet: Evm {
    /// Returns the address this wallet signs transactions from.
    fn address(&self) -> Address;

    /// Sign and broadcast a contract call transaction.
    ///
    /// - `contract` - target contract address
    /// - `calldata` - ABI-encoded function call
    /// - `value` - native coin attached to the call
    /// - `note` - human-readable operation description used for logging
    async fn broadcast(
        &self,
        contract: Address,
        calldata: Bytes,
        value: U256,
        note: &str,
    ) -> Result<TxHash, EvmError>;

    /// Wait until a broadcast transaction is mined.
    ///
    /// Returns [`EvmError::Reverted`] when the receipt reports failure.
    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<TxHash, EvmError>;

    /// Broadcast and confirm in one step.
    async fn send(
        &self,
        contract: Address,
        calldata: Bytes,
        value: U256,
        note: &str,
    ) -> Result<TxHash, EvmError> {
        let tx_hash = self.broadcast(contract, calldata, value, note).await?;
        self.confirm(tx_hash, note).await
    }

    /// Broadcast and confirm a typed `sol!` call carrying no value.
    async fn submit<C>(&self, contract: Address, call: C, note: &str) -> Result<TxHash, EvmError>
    where
        C: SolCall + Send + Sync + 'static,
    {
        self.send(contract, Bytes::from(call.abi_encode()), U256::ZERO, note)
            .await
    }
}

#[async_trait]
impl<T: Evm> Evm for Arc<T> {
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        (**self).call(contract, calldata).await
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, EvmError> {
        (**self).native_balance(owner).await
    }
}

#[async_trait]
impl<T: Wallet> Wallet for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn broadcast(
        &self,
        contract: Address,
        calldata: Bytes,
        value: U256,
        note: &str,
    ) -> Result<TxHash, EvmError> {
        (**self).broadcast(contract, calldata, value, note).await
    }

    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<TxHash, EvmError> {
        (**self).confirm(tx_hash, note).await
    }
}
