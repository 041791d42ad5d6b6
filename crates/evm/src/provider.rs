//! Read-only [`Evm`] implementation over any alloy provider.

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tracing::debug;

use crate::error_decoding::decode_rpc_error;
use crate::{Evm, EvmError};

/// Read-only chain access backed by an alloy provider.
///
/// Used for quoting and balance reads when no signing key is available.
#[derive(Clone)]
pub struct ProviderEvm<P> {
    provider: P,
}

impl<P> ProviderEvm<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P> Evm for ProviderEvm<P>
where
    P: Provider + Clone + Send + Sync + 'static,
{
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        provider_call(&self.provider, contract, calldata).await
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, EvmError> {
        Ok(self.provider.get_balance(owner).await?)
    }
}

pub(crate) async fn provider_call<P: Provider>(
    provider: &P,
    contract: Address,
    calldata: Bytes,
) -> Result<Bytes, EvmError> {
    debug!(%contract, "eth_call");

    let tx = TransactionRequest::default()
        .to(contract)
        .input(calldata.into());

    provider.call(tx).await.map_err(decode_rpc_error)
}
