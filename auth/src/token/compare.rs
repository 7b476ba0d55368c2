use sha2::Digest;
use sha2::Sha256;

/// Compare two secrets without leaking where they differ.
///
/// Both inputs are reduced to SHA-256 digests first, so the running time
/// depends on neither the position of the first differing byte nor on
/// whether the lengths match.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let left = Sha256::digest(a.as_bytes());
    let right = Sha256::digest(b.as_bytes());

    let mut diff = 0u8;
    for (x, y) in left.iter().zip(right.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}
