//! Deposit and withdrawal core for YO Protocol vaults on Base.
//!
//! The crate is layered bottom-up: [`amount`] and [`registry`] hold pure
//! data, [`quote`], [`allowance`] and [`balance`] wrap individual chain
//! reads and writes, [`transaction`] sequences them into complete flows,
//! and [`session`] publishes the resulting state for a front-end.

pub mod allowance;
pub mod amount;
pub mod balance;
pub mod bindings;
pub mod cli;
pub mod config;
pub mod quote;
pub mod registry;
pub mod session;
pub mod transaction;

pub use config::setup_tracing;

#[cfg(test)]
pub(crate) mod test_utils;
