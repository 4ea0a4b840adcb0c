// src/miner/validator.rs
//! Proof-of-work hash validation
//!
//! The preimage is the tightly packed encoding of
//! `(bytes32 lastHash, address miner, uint256 nonce, uint256 timestamp)`:
//! each field at its canonical width, big-endian, no length prefixes or
//! delimiters. The hash is Keccak-256 of those 116 bytes. This must match
//! the contract's own `keccak256(abi.encodePacked(...))` byte for byte,
//! otherwise locally valid nonces are rejected on chain.

use alloy_primitives::{Address, B256, U256, keccak256};

const HASH_LEN: usize = 32;
const ADDRESS_LEN: usize = 20;
const WORD_LEN: usize = 32;

const ADDRESS_OFFSET: usize = HASH_LEN;
const NONCE_OFFSET: usize = ADDRESS_OFFSET + ADDRESS_LEN;
const TIMESTAMP_OFFSET: usize = NONCE_OFFSET + WORD_LEN;

/// Length of the packed preimage in bytes
pub const PACKED_LEN: usize = TIMESTAMP_OFFSET + WORD_LEN;

/// Packs the four-tuple into the fixed-width preimage
pub fn encode_packed(
    last_hash: &B256,
    miner: &Address,
    nonce: U256,
    timestamp: U256,
) -> [u8; PACKED_LEN] {
    let mut buf = [0u8; PACKED_LEN];
    buf[..ADDRESS_OFFSET].copy_from_slice(last_hash.as_slice());
    buf[ADDRESS_OFFSET..NONCE_OFFSET].copy_from_slice(miner.as_slice());
    buf[NONCE_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&nonce.to_be_bytes::<WORD_LEN>());
    buf[TIMESTAMP_OFFSET..].copy_from_slice(&timestamp.to_be_bytes::<WORD_LEN>());
    buf
}

/// Strict threshold comparison: the hash as a big-endian integer must be
/// below `difficulty`. Equality is not a solution.
pub fn meets_difficulty(hash: &B256, difficulty: &U256) -> bool {
    U256::from_be_bytes(hash.0) < *difficulty
}

/// Computes the proof-of-work hash and whether it beats `difficulty`
///
/// Pure: the same inputs always give the same `(hash, is_valid)`.
pub fn validate(
    last_hash: &B256,
    miner: &Address,
    nonce: U256,
    timestamp: u64,
    difficulty: &U256,
) -> (B256, bool) {
    let hash = keccak256(encode_packed(
        last_hash,
        miner,
        nonce,
        U256::from(timestamp),
    ));
    let valid = meets_difficulty(&hash, difficulty);
    (hash, valid)
}

/// Reusable preimage buffer for the hot search loop
///
/// Hash, address and timestamp stay fixed for a whole task, so only the
/// nonce word is rewritten between attempts.
#[derive(Clone)]
pub struct Preimage {
    buf: [u8; PACKED_LEN],
}

impl Preimage {
    /// Builds a buffer with the nonce word zeroed
    pub fn new(last_hash: &B256, miner: &Address, timestamp: u64) -> Self {
        Preimage {
            buf: encode_packed(last_hash, miner, U256::ZERO, U256::from(timestamp)),
        }
    }

    /// Hashes the preimage with `nonce` in place
    pub fn hash(&mut self, nonce: U256) -> B256 {
        self.buf[NONCE_OFFSET..TIMESTAMP_OFFSET].copy_from_slice(&nonce.to_be_bytes::<WORD_LEN>());
        keccak256(self.buf)
    }

    /// Raw packed bytes as they currently stand
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
