//! Generic hash helpers
//!
//! Provides unified hashing for SHA256, SHA512, and BLAKE3.

use std::fmt;
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Blake3,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha512 => "SHA512",
            Self::Blake3 => "BLAKE3",
        }
    }

    /// Prefix used in `<algo>:<hex>` checksum strings
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Blake3 => "blake3",
        }
    }

    /// Length of the hex-encoded digest
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 | Self::Blake3 => 64,
            Self::Sha512 => 128,
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "sha256" => Some(Self::Sha256),
            "sha512" => Some(Self::Sha512),
            "blake3" => Some(Self::Blake3),
            _ => None,
        }
    }
}

/// An expected content hash: algorithm plus lowercase hex digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

impl Checksum {
    /// Parse `sha256:<hex>`, `sha512:<hex>`, `blake3:<hex>` or bare hex (SHA256).
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let (algorithm, digest) = match s.split_once(':') {
            Some((prefix, digest)) => {
                let algorithm = HashAlgorithm::from_prefix(prefix)
                    .ok_or_else(|| format!("unsupported checksum algorithm: {}", prefix))?;
                (algorithm, digest)
            }
            None => (HashAlgorithm::Sha256, s),
        };

        if digest.len() != algorithm.hex_len() || !digest.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(format!(
                "{} checksum must be {} hex characters, got '{}'",
                algorithm.name(),
                algorithm.hex_len(),
                digest
            ));
        }

        Ok(Self {
            algorithm,
            digest: digest.to_ascii_lowercase(),
        })
    }

    pub fn sha256(digest: &str) -> Result<Self, String> {
        Self::parse(&format!("sha256:{}", digest))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.prefix(), self.digest)
    }
}

/// Hash a file with the given algorithm, returning the lowercase hex digest.
pub fn hash_file(file: &Path, algorithm: HashAlgorithm) -> std::io::Result<String> {
    let mut f = std::fs::File::open(file)?;
    match algorithm {
        HashAlgorithm::Sha256 => hash_reader::<sha2::Sha256>(&mut f),
        HashAlgorithm::Sha512 => hash_reader::<sha2::Sha512>(&mut f),
        HashAlgorithm::Blake3 => hash_blake3(&mut f),
    }
}

/// Compute hash using sha2 crate (SHA256/SHA512)
fn hash_reader<D: sha2::Digest>(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compute BLAKE3 hash (separate implementation due to different API)
fn hash_blake3(reader: &mut impl Read) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute all hashes for a file at once (for `formula hash`).
pub fn compute_all_hashes(file: &Path) -> std::io::Result<FileHashes> {
    use sha2::Digest;

    let mut f = std::fs::File::open(file)?;
    let mut sha256_hasher = sha2::Sha256::new();
    let mut sha512_hasher = sha2::Sha512::new();
    let mut blake3_hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let n = f.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        sha256_hasher.update(&buffer[..n]);
        sha512_hasher.update(&buffer[..n]);
        blake3_hasher.update(&buffer[..n]);
    }

    Ok(FileHashes {
        sha256: hex::encode(sha256_hasher.finalize()),
        sha512: hex::encode(sha512_hasher.finalize()),
        blake3: blake3_hasher.finalize().to_hex().to_string(),
    })
}

/// Container for computed file hashes
#[derive(Debug, Clone)]
pub struct FileHashes {
    pub sha256: String,
    pub sha512: String,
    pub blake3: String,
}
