//! Request fingerprints used as cache keys.
//!
//! A fingerprint is the 32-bit FNV-1a hash of `host + port + path + method`.
//! It only identifies a cache slot: two different requests that collide share
//! the same entry.

use std::fmt;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Cache key derived from the identity of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u32);

impl Fingerprint {
    /// Hash the request identity tuple.
    pub fn new(host: &str, port: &str, path: &str, method: &str) -> Self {
        let hash = [host, port, path, method]
            .iter()
            .flat_map(|part| part.bytes())
            .fold(FNV_OFFSET_BASIS, |acc, byte| {
                (acc ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
            });
        Self(hash)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Decimal rendering; this is the key written to the index and object stores.
impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
