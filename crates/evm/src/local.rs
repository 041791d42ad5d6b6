//! Local private-key signer.
//!
//! `PrivateKeyWallet` wraps an alloy provider with an embedded
//! `EthereumWallet` and submits transactions directly to the RPC node.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{PendingTransactionBuilder, Provider, WalletProvider};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tracing::info;

use crate::error_decoding::decode_rpc_error;
use crate::provider::provider_call;
use crate::{Evm, EvmError, Wallet};

/// Local wallet that signs and submits transactions directly.
///
/// Wraps a provider that includes a wallet filler (e.g., built with
/// `ProviderBuilder::new().wallet(wallet).connect_http(...)`). The wallet
/// address is derived from the provider's default signer.
#[derive(Clone)]
pub struct PrivateKeyWallet<P> {
    provider: P,
    required_confirmations: u64,
}

impl<P> PrivateKeyWallet<P> {
    pub fn new(provider: P, required_confirmations: u64) -> Self {
        Self {
            provider,
            required_confirmations,
        }
    }
}

#[async_trait]
impl<P> Evm for PrivateKeyWallet<P>
where
    P: Provider + WalletProvider + Clone + Send + Sync + 'static,
{
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        provider_call(&self.provider, contract, calldata).await
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, EvmError> {
        Ok(self.provider.get_balance(owner).await?)
    }
}

#[async_trait]
impl<P> Wallet for PrivateKeyWallet<P>
where
    P: Provider + WalletProvider + Clone + Send + Sync + 'static,
{
    fn address(&self) -> Address {
        self.provider.default_signer_address()
    }

    async fn broadcast(
        &self,
        contract: Address,
        calldata: Bytes,
        value: U256,
        note: &str,
    ) -> Result<TxHash, EvmError> {
        info!(%contract, %value, note, "Submitting contract call");

        let tx = TransactionRequest::default()
            .to(contract)
            .value(value)
            .input(calldata.into());

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(decode_rpc_error)?;
        let tx_hash = *pending.tx_hash();

        info!(%tx_hash, note, "Transaction submitted");

        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash, note: &str) -> Result<TxHash, EvmError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await?;

        if !receipt.status() {
            return Err(EvmError::Reverted { tx_hash });
        }

        info!(%tx_hash, note, "Transaction confirmed");

        Ok(receipt.transaction_hash)
    }
}
