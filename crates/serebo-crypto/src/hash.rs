//! The SEREBO hash composite.
//!
//! Every record hash in the black box is the colon-joined concatenation of
//! twelve lowercase-hex digests in a fixed order:
//!
//! `md5 : sha1 : sha224 : sha3_224 : sha256 : sha3_256 : sha384 :
//!  sha3_384 : sha512 : sha3_512 : blake2b : blake2s`
//!
//! The ordering is part of the external contract — auditors recompute and
//! string-compare, so reordering a single digest breaks every store.
//! Notary cross-signing uses a reduced six-digest composite
//! (`md5:sha1:sha224:sha256:sha384:sha512`).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use blake2::{Blake2b512, Blake2s256};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use sha3::{Digest, Sha3_224, Sha3_256, Sha3_384, Sha3_512};

use serebo_core::SereboError;

/// Streaming wrapper feeding one input through all twelve digests at once.
///
/// Used directly for file hashing; `composite12` is the one-shot form.
pub struct CompositeHasher {
    md5: Md5,
    sha1: Sha1,
    sha224: Sha224,
    sha3_224: Sha3_224,
    sha256: Sha256,
    sha3_256: Sha3_256,
    sha384: Sha384,
    sha3_384: Sha3_384,
    sha512: Sha512,
    sha3_512: Sha3_512,
    blake2b: Blake2b512,
    blake2s: Blake2s256,
}

impl CompositeHasher {
    pub fn new() -> Self {
        CompositeHasher {
            md5: Md5::new(),
            sha1: Sha1::new(),
            sha224: Sha224::new(),
            sha3_224: Sha3_224::new(),
            sha256: Sha256::new(),
            sha3_256: Sha3_256::new(),
            sha384: Sha384::new(),
            sha3_384: Sha3_384::new(),
            sha512: Sha512::new(),
            sha3_512: Sha3_512::new(),
            blake2b: Blake2b512::new(),
            blake2s: Blake2s256::new(),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.md5.update(chunk);
        self.sha1.update(chunk);
        self.sha224.update(chunk);
        self.sha3_224.update(chunk);
        self.sha256.update(chunk);
        self.sha3_256.update(chunk);
        self.sha384.update(chunk);
        self.sha3_384.update(chunk);
        self.sha512.update(chunk);
        self.sha3_512.update(chunk);
        self.blake2b.update(chunk);
        self.blake2s.update(chunk);
    }

    /// Finish all twelve digests and join them in canonical order.
    pub fn finalize(self) -> String {
        [
            hex::encode(self.md5.finalize()),
            hex::encode(self.sha1.finalize()),
            hex::encode(self.sha224.finalize()),
            hex::encode(self.sha3_224.finalize()),
            hex::encode(self.sha256.finalize()),
            hex::encode(self.sha3_256.finalize()),
            hex::encode(self.sha384.finalize()),
            hex::encode(self.sha3_384.finalize()),
            hex::encode(self.sha512.finalize()),
            hex::encode(self.sha3_512.finalize()),
            hex::encode(self.blake2b.finalize()),
            hex::encode(self.blake2s.finalize()),
        ]
        .join(":")
    }
}

impl Default for CompositeHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Twelve-digest composite of `data`. Pure and deterministic.
pub fn composite12(data: &[u8]) -> String {
    let mut h = CompositeHasher::new();
    h.update(data);
    h.finalize()
}

/// Six-digest composite used for notary cross-signing codes.
pub fn composite6(data: &[u8]) -> String {
    [
        hex::encode(Md5::digest(data)),
        hex::encode(Sha1::digest(data)),
        hex::encode(Sha224::digest(data)),
        hex::encode(Sha256::digest(data)),
        hex::encode(Sha384::digest(data)),
        hex::encode(Sha512::digest(data)),
    ]
    .join(":")
}

/// Twelve-digest composite of a file's content, streamed in 64 KiB chunks.
/// A zero-length file yields the empty-input composite.
pub fn file_composite12<P: AsRef<Path>>(path: P) -> Result<String, SereboError> {
    let file = File::open(path.as_ref())
        .map_err(|e| SereboError::StoreIo(format!("{}: {e}", path.as_ref().display())))?;
    let mut reader = BufReader::new(file);
    let mut hasher = CompositeHasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| SereboError::StoreIo(format!("{}: {e}", path.as_ref().display())))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hex length of each segment in canonical order.
    const SEGMENT_HEX_LENGTHS: [usize; 12] = [32, 40, 56, 56, 64, 64, 96, 96, 128, 128, 128, 64];

    #[test]
    fn composite12_has_twelve_segments_of_expected_width() {
        let c = composite12(b"hello");
        let parts: Vec<&str> = c.split(':').collect();
        assert_eq!(parts.len(), 12);
        for (part, want) in parts.iter().zip(SEGMENT_HEX_LENGTHS) {
            assert_eq!(part.len(), want);
            assert!(part.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
        }
    }

    #[test]
    fn composite12_is_deterministic() {
        assert_eq!(composite12(b"serebo"), composite12(b"serebo"));
        assert_ne!(composite12(b"serebo"), composite12(b"serebO"));
    }

    #[test]
    fn empty_input_matches_known_vectors() {
        let c = composite12(b"");
        let parts: Vec<&str> = c.split(':').collect();
        assert_eq!(parts[0], "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(parts[1], "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            parts[4],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            parts[8],
            "cf83e1357eefb8bdf1542850d66d8007d620e4050b5715dc83f4a921d36ce9ce\
             47d0d13c5d85f2b0ff8318d2877eec2f63b931bd47417a81a538327af927da3e"
        );
    }

    #[test]
    fn composite6_is_a_prefix_family_of_composite12() {
        let c6: Vec<String> = composite6(b"x").split(':').map(String::from).collect();
        let c12: Vec<String> = composite12(b"x").split(':').map(String::from).collect();
        assert_eq!(c6.len(), 6);
        // md5, sha1, sha224, sha256, sha384, sha512 at their c12 positions.
        assert_eq!(c6[0], c12[0]);
        assert_eq!(c6[1], c12[1]);
        assert_eq!(c6[2], c12[2]);
        assert_eq!(c6[3], c12[4]);
        assert_eq!(c6[4], c12[6]);
        assert_eq!(c6[5], c12[8]);
    }

    #[test]
    fn chunked_updates_match_one_shot() {
        let mut h = CompositeHasher::new();
        h.update(b"hello ");
        h.update(b"world");
        assert_eq!(h.finalize(), composite12(b"hello world"));
    }

    #[test]
    fn file_hash_matches_in_memory_hash() {
        let path = std::env::temp_dir().join("serebo_crypto_file_test.bin");
        std::fs::write(&path, b"file payload").unwrap();
        assert_eq!(file_composite12(&path).unwrap(), composite12(b"file payload"));
        std::fs::write(&path, b"").unwrap();
        assert_eq!(file_composite12(&path).unwrap(), composite12(b""));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_a_store_io_error() {
        let err = file_composite12("/no/such/serebo/file").unwrap_err();
        assert!(matches!(err, SereboError::StoreIo(_)));
    }
}
