//! Uniform random strings over the canonical 80-character alphabet.

use rand::Rng;

use serebo_core::constants::RANDOM_ALPHABET;

/// Random string of length `len`, drawn uniformly with replacement from
/// the canonical alphabet. Not a secret in itself — uniqueness is what
/// the chain nonces and the blackboxID rely on, and the lengths used
/// there (32 and 512) make collisions implausible.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| RANDOM_ALPHABET[rng.gen_range(0..RANDOM_ALPHABET.len())] as char)
        .collect()
}
