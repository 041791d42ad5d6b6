//! Slippage tolerance and the minimum-output guard derived from it.

use std::fmt::Display;

use alloy::primitives::U256;

const BPS_DENOMINATOR: u16 = 10_000;

/// Maximum acceptable deviation between a quote and execution, in basis
/// points. Always in `[0, 10000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlippageBps(u16);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("slippage must be below 10000 bps, got {0}")]
pub struct InvalidSlippage(pub u16);

impl SlippageBps {
    /// 1%.
    pub const DEFAULT: Self = Self(100);

    pub fn new(bps: u16) -> Result<Self, InvalidSlippage> {
        if bps >= BPS_DENOMINATOR {
            return Err(InvalidSlippage(bps));
        }

        Ok(Self(bps))
    }

    pub fn bps(self) -> u16 {
        self.0
    }

    /// Lowest output the contract call may accept for a `quoted` output:
    /// `quoted * (10000 - bps) / 10000`, rounded down.
    pub fn min_output(self, quoted: U256) -> U256 {
        let keep = U256::from(BPS_DENOMINATOR - self.0);
        let denominator = U256::from(BPS_DENOMINATOR);

        match quoted.checked_mul(keep) {
            Some(product) => product / denominator,
            // Dividing first still rounds down, just by at most one more unit.
            None => quoted / denominator * keep,
        }
    }
}

impl Default for SlippageBps {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for SlippageBps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bps", self.0)
    }
}
