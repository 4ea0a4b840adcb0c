// src/network/mod.rs
//! Network communication components
//!
//! This module handles all interaction with the remote ledger:
//! - `Ledger`: the read/write contract the mining core depends on
//! - `RpcLedger`: its JSON-RPC implementation over HTTP or WebSocket
//! - `abi`: the mining contract's functions, declared with `sol!`

/// Mining contract interface
pub mod abi;

/// Remote ledger trait and snapshot fetching
pub mod ledger;

/// JSON-RPC client for the mining contract
///
/// Reads through `eth_call`, submits locally signed transactions through
/// `eth_sendRawTransaction` and confirms by polling transaction receipts.
pub mod rpc;

// Re-export main components for cleaner imports
pub use ledger::{Ledger, current_timestamp};
pub use rpc::{LedgerConfig, RpcLedger};
