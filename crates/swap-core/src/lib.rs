//! Swap lifecycle engine.
//!
//! Ties the vault, store, chain readers, and orderbook client into the
//! swap state machine: per-chain deposit pollers detect funded vaults and
//! dispatch them to the lifecycle orchestrator, which builds the permit
//! pre-hook, signs the GPv2 order, and submits it; a process-wide
//! settlement poller then tracks submitted orders to a terminal state and
//! expires swaps that never received a deposit.

/// Per-chain deposit polling loop.
pub mod deposit;
/// Prometheus metrics registry and instruments.
pub mod metrics;
/// Deposit-to-order execution pipeline.
pub mod orchestrator;
/// EIP-2612 permit construction and app-data assembly.
pub mod permit;
/// Settlement tracking loop.
pub mod settlement;
/// GPv2 order construction, signing, and submission.
pub mod signing;

pub use deposit::DepositPoller;
pub use orchestrator::LifecycleOrchestrator;
pub use permit::{PermitArtifacts, PermitBuilder};
pub use settlement::SettlementPoller;
pub use signing::{build_sell_order, OrderSigner};
