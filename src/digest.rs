//! # Digest Keyer
//!
//! Maps a URI string to the stable hex digest that names its cache file.

use sha1::{Digest, Sha1};

use crate::error::TransferError;

/// Derives a deterministic, fixed-length hex digest from a URI.
///
/// The digest names the cache file for that URI, so the algorithm and
/// encoding must be stable across runs and platforms.
#[async_trait::async_trait]
pub trait DigestKeyer: Send + Sync {
    /// Hash `input` to a lowercase hex string.
    async fn hash(&self, input: &str) -> Result<String, TransferError>;
}

/// SHA-1 based keyer.
///
/// SHA-1 is used for its combination of speed and ubiquity; the digest only
/// names files and carries no security weight. Hashing is offloaded to the
/// blocking pool so a burst of resolutions never stalls the async executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha1Keyer;

#[async_trait::async_trait]
impl DigestKeyer for Sha1Keyer {
    async fn hash(&self, input: &str) -> Result<String, TransferError> {
        let input = input.to_owned();
        let digest = tokio::task::spawn_blocking(move || {
            let mut hasher = Sha1::new();
            hasher.update(input.as_bytes());
            hex::encode(hasher.finalize())
        })
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))?;

        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sha1_hex_is_stable() {
        let keyer = Sha1Keyer;
        let digest = keyer.hash("hello").await.unwrap();
        assert_eq!(digest, "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[tokio::test]
    async fn distinct_inputs_produce_distinct_digests() {
        let keyer = Sha1Keyer;
        let a = keyer.hash("https://example.com/a.png").await.unwrap();
        let b = keyer.hash("https://example.com/b.png").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 40);
        assert_eq!(b.len(), 40);
    }
}
