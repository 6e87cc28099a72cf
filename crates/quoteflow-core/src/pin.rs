//! # PIN Security Service
//!
//! Salted hashing for public-link PINs.
//!
//! ## Hash Format
//! The stored value is a self-describing string:
//!
//! ```text
//! argon2id$m=19456,t=2,p=1$<salt hex>$<key hex>
//! ─┬─────  ─┬──────────── ─┬───────── ─┬───────
//!  │        │              │           └ derived key (32 bytes)
//!  │        │              └ random salt (16 bytes, fresh per call)
//!  │        └ cost parameters embedded per hash
//!  └ algorithm name
//! ```
//!
//! Embedding the algorithm and its cost parameters next to the hash lets
//! the cost change later without invalidating stored hashes: verification
//! always re-derives with the parameters a hash was created under.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::{CoreError, CoreResult};

const ALGORITHM: &str = "argon2id";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

// Current cost parameters for new hashes. Stored hashes keep verifying
// under whatever parameters they embed.
const M_COST_KIB: u32 = 19_456;
const T_COST: u32 = 2;
const P_COST: u32 = 1;

/// Parsed form of a stored PIN hash.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PinHash {
    algorithm: String,
    m_cost: u32,
    t_cost: u32,
    p_cost: u32,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl PinHash {
    fn encode(&self) -> String {
        format!(
            "{}$m={},t={},p={}${}${}",
            self.algorithm,
            self.m_cost,
            self.t_cost,
            self.p_cost,
            hex::encode(&self.salt),
            hex::encode(&self.key)
        )
    }

    fn parse(stored: &str) -> Option<PinHash> {
        let mut parts = stored.split('$');
        let algorithm = parts.next()?;
        let params = parts.next()?;
        let salt = hex::decode(parts.next()?).ok()?;
        let key = hex::decode(parts.next()?).ok()?;
        if parts.next().is_some() || algorithm != ALGORITHM {
            return None;
        }

        let mut m_cost = None;
        let mut t_cost = None;
        let mut p_cost = None;
        for pair in params.split(',') {
            let (name, value) = pair.split_once('=')?;
            let value: u32 = value.parse().ok()?;
            match name {
                "m" => m_cost = Some(value),
                "t" => t_cost = Some(value),
                "p" => p_cost = Some(value),
                _ => return None,
            }
        }

        Some(PinHash {
            algorithm: algorithm.to_string(),
            m_cost: m_cost?,
            t_cost: t_cost?,
            p_cost: p_cost?,
            salt,
            key,
        })
    }
}

fn derive_key(pin: &str, salt: &[u8], m_cost: u32, t_cost: u32, p_cost: u32) -> Option<Vec<u8>> {
    let params = Params::new(m_cost, t_cost, p_cost, Some(KEY_LEN)).ok()?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = vec![0u8; KEY_LEN];
    argon2.hash_password_into(pin.as_bytes(), salt, &mut key).ok()?;
    Some(key)
}

/// Hashes a PIN with a fresh random salt.
///
/// Two calls with the same PIN never produce the same output.
pub fn hash_pin(pin: &str) -> CoreResult<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(pin, &salt, M_COST_KIB, T_COST, P_COST)
        .ok_or_else(|| CoreError::Internal("PIN key derivation failed".to_string()))?;

    Ok(PinHash {
        algorithm: ALGORITHM.to_string(),
        m_cost: M_COST_KIB,
        t_cost: T_COST,
        p_cost: P_COST,
        salt: salt.to_vec(),
        key,
    }
    .encode())
}

/// Verifies a PIN against a stored hash string.
///
/// Re-derives with the cost parameters embedded in the stored hash and
/// compares in constant time. The key length is compared in constant time
/// first, so a length mismatch does not short-circuit the byte comparison.
/// Unparseable stored values verify as false.
pub fn verify_pin(pin: &str, stored: &str) -> bool {
    let parsed = match PinHash::parse(stored) {
        Some(parsed) => parsed,
        None => return false,
    };

    let derived = match derive_key(pin, &parsed.salt, parsed.m_cost, parsed.t_cost, parsed.p_cost) {
        Some(derived) => derived,
        None => return false,
    };

    let len_eq = (derived.len() as u64).ct_eq(&(parsed.key.len() as u64));
    if !bool::from(len_eq) {
        return false;
    }

    bool::from(derived.as_slice().ct_eq(parsed.key.as_slice()))
}

// =============================================================================
// Unit Tests
// =============================================================================
