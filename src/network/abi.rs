// src/network/abi.rs
//! Mining contract interface
//!
//! Call data and return values are encoded by `alloy-sol-types` from the
//! declarations below.
#![allow(missing_docs)]

use crate::utils::error::MinerError;
use alloy_sol_types::{SolCall, sol};

sol! {
    function mine(uint256 nonce, uint256 timestamp) external;
    function checkHash(uint256 nonce, uint256 timestamp) external view returns (bytes32 hash, bool valid);
    function getEffectiveDifficulty(uint256 _timestamp) public view returns (uint256);
    function lastHash() external view returns (bytes32);
    function getDifficultyPercent() external view returns (uint256);
    function getBaseDifficultyPercent() external view returns (uint256);
    function getTimeSinceLastMine() external view returns (uint256);
    function remainingSupply() external view returns (uint256);
    function totalMines() external view returns (uint256);
    function minerStats(address) external view returns (uint256);
    function balanceOf(address) external view returns (uint256);
}

/// Decodes the return data of `C`
pub fn decode_returns<C: SolCall>(data: &[u8]) -> Result<C::Return, MinerError> {
    C::abi_decode_returns(data)
        .map_err(|e| MinerError::ProtocolError(format!("{} returned bad data: {}", C::SIGNATURE, e)))
}
