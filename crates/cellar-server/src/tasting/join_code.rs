//! Join codes for social tasting sessions.

use rand::RngExt;

/// Unambiguous alphabet: no `I`, `O`, `0` or `1`.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const CODE_LEN: usize = 6;

/// Generate a random join code.
pub fn generate() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect()
}

/// Normalise user input for lookup and comparison.
pub fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
