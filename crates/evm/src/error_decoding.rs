//! Contract error decoding utilities.
//!
//! Turns Solidity revert data carried by RPC errors into
//! human-readable messages (`Error(string)`, `Panic(uint256)` and
//! raw UTF-8 reasons) so a failed quote or a rejected deposit can be
//! reported to the user as something better than a hex blob.

use alloy::sol_types::decode_revert_reason;
use alloy::transports::{RpcError, TransportErrorKind};
use tracing::debug;

use crate::EvmError;

/// Converts a contract error into an [`EvmError`], decoding revert data
/// when present.
pub fn decode_contract_error(err: alloy::contract::Error) -> EvmError {
    if let Some(revert_data) = err.as_revert_data() {
        if let Some(reason) = decode_revert_reason(revert_data.as_ref()) {
            return EvmError::Revert(reason);
        }
        debug!("Failed to decode revert data");
    }

    EvmError::Contract(err)
}

/// Converts a transport-level RPC error (as returned by `eth_call`,
/// `eth_estimateGas` or `eth_sendTransaction`) into an [`EvmError`].
pub fn decode_rpc_error(err: RpcError<TransportErrorKind>) -> EvmError {
    decode_contract_error(alloy::contract::Error::TransportError(err))
}
