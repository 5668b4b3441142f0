//! FNV-1a hashing for partition keys.
//!
//! See <http://www.isthe.com/chongo/tech/comp/fnv/index.html>.
//!
//! # Design Decisions
//! - Pure function of the input bytes: stable across runs and platforms
//! - The empty input hashes to 0, not to the offset basis

const OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const PRIME: u64 = 1_099_511_628_211;

/// 64-bit FNV-1a hash of `bytes`. Empty input yields 0.
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    if bytes.is_empty() {
        return 0;
    }

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}

/// Int64 partition key for a UTF-8 string.
///
/// The hash bits are reinterpreted as a signed value, matching the
/// two's-complement layout int64 partition ranges are declared in.
pub fn partition_hash(value: &str) -> i64 {
    fnv1a_64(value.as_bytes()) as i64
}
