//! Shared test fixtures: an in-memory chain that understands the YO
//! gateway, ERC20 and WETH calls, plus a phase recorder.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, B256, Bytes, TxHash, U256, address};
use alloy::sol_types::SolCall;
use alloy::transports::TransportErrorKind;
use async_trait::async_trait;

use numu_evm::{Evm, EvmError, Wallet};

use crate::bindings::{IERC20, IWETH, IYoGateway};
use crate::registry::ContractRegistry;
use crate::transaction::{PhaseObserver, TransactionPhase};

pub(crate) const OWNER: Address = address!("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

/// One share is worth 1.05 assets unless a test says otherwise.
pub(crate) const DEFAULT_SHARE_PRICE: U256 =
    U256::from_limbs([1_050_000_000_000_000_000, 0, 0, 0]);

const PRICE_SCALE: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Parses a decimal string into base units, for fixtures.
pub(crate) fn units(amount: &str, decimals: u8) -> U256 {
    crate::amount::parse_amount(amount, decimals).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BroadcastCall {
    pub(crate) to: Address,
    pub(crate) selector: [u8; 4],
    pub(crate) value: U256,
    pub(crate) calldata: Bytes,
}

impl BroadcastCall {
    pub(crate) fn is<C: SolCall>(&self) -> bool {
        self.selector == C::SELECTOR
    }
}

#[derive(Debug, Clone, Copy)]
struct MockVault {
    asset: Address,
    share_price: U256,
}

#[derive(Debug, Default)]
struct ChainState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    native: HashMap<Address, U256>,
    vaults: HashMap<Address, MockVault>,
    weth: Option<Address>,
    read_count: usize,
    broadcasts: Vec<BroadcastCall>,
    mined: HashMap<TxHash, bool>,
    partner_ids: Vec<u32>,
    fail_quotes: bool,
    fail_balance_reads: bool,
    reject_signing: bool,
    revert_approvals: bool,
    revert_on_mining: bool,
    execution_drift_bps: u16,
}

/// In-memory gateway + ERC20 + WETH ledger implementing [`Evm`] and
/// [`Wallet`] for a single signer.
///
/// State changes apply at broadcast. A call that would revert fails at
/// broadcast with its revert reason, the way gas estimation surfaces it
/// on a real node.
pub(crate) struct MockChain {
    owner: Address,
    gateway: Address,
    state: Mutex<ChainState>,
}

impl MockChain {
    pub(crate) fn new(registry: &ContractRegistry) -> Self {
        let mut state = ChainState::default();

        for vault in registry.vaults() {
            state.vaults.insert(
                vault.address,
                MockVault {
                    asset: vault.asset.address,
                    share_price: DEFAULT_SHARE_PRICE,
                },
            );
            if vault.asset.wraps_native {
                state.weth = Some(vault.asset.address);
            }
        }

        Self {
            owner: OWNER,
            gateway: registry.gateway(),
            state: Mutex::new(state),
        }
    }

    pub(crate) fn set_token_balance(&self, token: Address, holder: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert((token, holder), amount);
    }

    pub(crate) fn set_native_balance(&self, holder: Address, amount: U256) {
        self.state.lock().unwrap().native.insert(holder, amount);
    }

    pub(crate) fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token, owner, spender), amount);
    }

    pub(crate) fn set_share_price(&self, vault: Address, share_price: U256) {
        if let Some(mock) = self.state.lock().unwrap().vaults.get_mut(&vault) {
            mock.share_price = share_price;
        }
    }

    pub(crate) fn fail_quotes(&self, fail: bool) {
        self.state.lock().unwrap().fail_quotes = fail;
    }

    pub(crate) fn fail_balance_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_balance_reads = fail;
    }

    pub(crate) fn reject_signing(&self, reject: bool) {
        self.state.lock().unwrap().reject_signing = reject;
    }

    pub(crate) fn revert_approvals(&self, revert: bool) {
        self.state.lock().unwrap().revert_approvals = revert;
    }

    pub(crate) fn revert_on_mining(&self, revert: bool) {
        self.state.lock().unwrap().revert_on_mining = revert;
    }

    /// Worsens execution against the quote by `bps`, as if the price moved
    /// between quoting and mining.
    pub(crate) fn set_execution_drift_bps(&self, bps: u16) {
        self.state.lock().unwrap().execution_drift_bps = bps;
    }

    pub(crate) fn token_balance(&self, token: Address, holder: Address) -> U256 {
        self.state.lock().unwrap().balance(token, holder)
    }

    pub(crate) fn native(&self, holder: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .native
            .get(&holder)
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state.lock().unwrap().allowance(token, owner, spender)
    }

    pub(crate) fn read_count(&self) -> usize {
        self.state.lock().unwrap().read_count
    }

    pub(crate) fn broadcasts(&self) -> Vec<BroadcastCall> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub(crate) fn broadcasts_of<C: SolCall>(&self) -> usize {
        self.broadcasts().iter().filter(|call| call.is::<C>()).count()
    }

    pub(crate) fn partner_ids(&self) -> Vec<u32> {
        self.state.lock().unwrap().partner_ids.clone()
    }

    /// No reads and no transactions have reached the chain.
    pub(crate) fn untouched(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.read_count == 0 && state.broadcasts.is_empty()
    }
}

fn revert(reason: &str) -> EvmError {
    EvmError::Revert(format!("revert: {reason}"))
}

fn selector(calldata: &[u8]) -> Result<[u8; 4], EvmError> {
    calldata
        .get(..4)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| revert("missing selector"))
}

impl ChainState {
    fn balance(&self, token: Address, holder: Address) -> U256 {
        self.balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn vault(&self, vault: Address) -> Result<MockVault, EvmError> {
        self.vaults
            .get(&vault)
            .copied()
            .ok_or_else(|| revert("unknown vault"))
    }

    fn to_shares(&self, vault: Address, assets: U256) -> Result<U256, EvmError> {
        let mock = self.vault(vault)?;
        Ok(assets * PRICE_SCALE / mock.share_price)
    }

    fn to_assets(&self, vault: Address, shares: U256) -> Result<U256, EvmError> {
        let mock = self.vault(vault)?;
        Ok(shares * mock.share_price / PRICE_SCALE)
    }

    fn drifted(&self, amount: U256) -> U256 {
        amount * U256::from(10_000 - self.execution_drift_bps) / U256::from(10_000u64)
    }

    fn debit(&mut self, token: Address, holder: Address, amount: U256) -> Result<(), EvmError> {
        let balance = self.balance(token, holder);
        if balance < amount {
            return Err(revert("ERC20: transfer amount exceeds balance"));
        }
        self.balances.insert((token, holder), balance - amount);
        Ok(())
    }

    fn credit(&mut self, token: Address, holder: Address, amount: U256) {
        let balance = self.balance(token, holder);
        self.balances.insert((token, holder), balance + amount);
    }

    fn spend_allowance(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), EvmError> {
        let allowance = self.allowance(token, owner, spender);
        if allowance < amount {
            return Err(revert("ERC20: insufficient allowance"));
        }
        self.allowances
            .insert((token, owner, spender), allowance - amount);
        Ok(())
    }

    fn read(&mut self, contract: Address, calldata: &[u8]) -> Result<Bytes, EvmError> {
        self.read_count += 1;

        let output = match selector(calldata)? {
            IERC20::balanceOfCall::SELECTOR => {
                if self.fail_balance_reads {
                    return Err(TransportErrorKind::custom_str("balance read timed out").into());
                }
                let call = IERC20::balanceOfCall::abi_decode(calldata)?;
                IERC20::balanceOfCall::abi_encode_returns(&self.balance(contract, call.account))
            }
            IERC20::allowanceCall::SELECTOR => {
                let call = IERC20::allowanceCall::abi_decode(calldata)?;
                IERC20::allowanceCall::abi_encode_returns(&self.allowance(
                    contract,
                    call.owner,
                    call.spender,
                ))
            }
            IYoGateway::quoteConvertToSharesCall::SELECTOR => {
                if self.fail_quotes {
                    return Err(TransportErrorKind::custom_str("quote request timed out").into());
                }
                let call = IYoGateway::quoteConvertToSharesCall::abi_decode(calldata)?;
                let shares = self.to_shares(call.yoVault, call.assets)?;
                IYoGateway::quoteConvertToSharesCall::abi_encode_returns(&shares)
            }
            IYoGateway::quoteConvertToAssetsCall::SELECTOR => {
                if self.fail_quotes {
                    return Err(TransportErrorKind::custom_str("quote request timed out").into());
                }
                let call = IYoGateway::quoteConvertToAssetsCall::abi_decode(calldata)?;
                let assets = self.to_assets(call.yoVault, call.shares)?;
                IYoGateway::quoteConvertToAssetsCall::abi_encode_returns(&assets)
            }
            IYoGateway::getAssetAllowanceCall::SELECTOR => {
                let call = IYoGateway::getAssetAllowanceCall::abi_decode(calldata)?;
                let asset = self.vault(call.yoVault)?.asset;
                IYoGateway::getAssetAllowanceCall::abi_encode_returns(&self.allowance(
                    asset, call.owner, contract,
                ))
            }
            IYoGateway::getShareAllowanceCall::SELECTOR => {
                let call = IYoGateway::getShareAllowanceCall::abi_decode(calldata)?;
                IYoGateway::getShareAllowanceCall::abi_encode_returns(&self.allowance(
                    call.yoVault,
                    call.owner,
                    contract,
                ))
            }
            _ => return Err(revert("unknown view selector")),
        };

        Ok(Bytes::from(output))
    }

    fn execute(
        &mut self,
        gateway: Address,
        from: Address,
        contract: Address,
        calldata: &[u8],
        value: U256,
    ) -> Result<(), EvmError> {
        match selector(calldata)? {
            IERC20::approveCall::SELECTOR => {
                if self.revert_approvals {
                    return Err(revert("approve paused"));
                }
                let call = IERC20::approveCall::abi_decode(calldata)?;
                self.allowances
                    .insert((contract, from, call.spender), call.amount);
            }
            IYoGateway::depositCall::SELECTOR if contract == gateway => {
                let call = IYoGateway::depositCall::abi_decode(calldata)?;
                let asset = self.vault(call.yoVault)?.asset;
                let shares = self.drifted(self.to_shares(call.yoVault, call.assets)?);
                if shares < call.minSharesOut {
                    return Err(revert("YoGateway: insufficient shares out"));
                }
                self.spend_allowance(asset, from, gateway, call.assets)?;
                self.debit(asset, from, call.assets)?;
                self.credit(asset, call.yoVault, call.assets);
                self.credit(call.yoVault, call.receiver, shares);
                self.partner_ids.push(call.partnerId);
            }
            IYoGateway::redeemCall::SELECTOR if contract == gateway => {
                let call = IYoGateway::redeemCall::abi_decode(calldata)?;
                let asset = self.vault(call.yoVault)?.asset;
                let assets = self.drifted(self.to_assets(call.yoVault, call.shares)?);
                if assets < call.minAssetsOut {
                    return Err(revert("YoGateway: insufficient assets out"));
                }
                self.spend_allowance(call.yoVault, from, gateway, call.shares)?;
                self.debit(call.yoVault, from, call.shares)?;
                self.credit(asset, call.receiver, assets);
                self.partner_ids.push(call.partnerId);
            }
            IWETH::depositCall::SELECTOR if Some(contract) == self.weth => {
                let native = self.native.get(&from).copied().unwrap_or_default();
                if native < value {
                    return Err(revert("insufficient funds for transfer"));
                }
                self.native.insert(from, native - value);
                self.credit(contract, from, value);
            }
            IWETH::withdrawCall::SELECTOR if Some(contract) == self.weth => {
                let call = IWETH::withdrawCall::abi_decode(calldata)?;
                self.debit(contract, from, call.wad)?;
                let native = self.native.get(&from).copied().unwrap_or_default();
                self.native.insert(from, native + call.wad);
            }
            _ => return Err(revert("unknown transaction selector")),
        }

        Ok(())
    }
}

#[async_trait]
impl Evm for MockChain {
    async fn call(&self, contract: Address, calldata: Bytes) -> Result<Bytes, EvmError> {
        self.state.lock().unwrap().read(contract, &calldata)
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, EvmError> {
        let mut state = self.state.lock().unwrap();
        state.read_count += 1;
        Ok(state.native.get(&owner).copied().unwrap_or_default())
    }
}

#[async_trait]
impl Wallet for MockChain {
    fn address(&self) -> Address {
        self.owner
    }

    async fn broadcast(
        &self,
        contract: Address,
        calldata: Bytes,
        value: U256,
        _note: &str,
    ) -> Result<TxHash, EvmError> {
        let mut state = self.state.lock().unwrap();

        if state.reject_signing {
            return Err(TransportErrorKind::custom_str("User rejected the request").into());
        }

        // A transaction that reverts on-chain leaves no state behind.
        let succeeded = !state.revert_on_mining;
        if succeeded {
            state.execute(self.gateway, self.owner, contract, &calldata, value)?;
        }

        state.broadcasts.push(BroadcastCall {
            to: contract,
            selector: selector(&calldata)?,
            value,
            calldata,
        });

        let tx_hash = B256::from(U256::from(state.broadcasts.len()));
        state.mined.insert(tx_hash, succeeded);

        Ok(tx_hash)
    }

    async fn confirm(&self, tx_hash: TxHash, _note: &str) -> Result<TxHash, EvmError> {
        match self.state.lock().unwrap().mined.get(&tx_hash) {
            Some(true) => Ok(tx_hash),
            _ => Err(EvmError::Reverted { tx_hash }),
        }
    }
}

/// Collects every phase the orchestrator reports.
#[derive(Debug, Default)]
pub(crate) struct PhaseRecorder {
    phases: Mutex<Vec<TransactionPhase>>,
}

impl PhaseRecorder {
    pub(crate) fn phases(&self) -> Vec<TransactionPhase> {
        self.phases.lock().unwrap().clone()
    }
}

impl PhaseObserver for PhaseRecorder {
    fn on_phase(&self, phase: TransactionPhase) {
        self.phases.lock().unwrap().push(phase);
    }
}
