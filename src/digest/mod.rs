//! Content digests (`<algorithm>:<hex>`) and the registered-algorithm table
//! used to verify them.
//!
//! A digest is only meaningful relative to a registry of known algorithms:
//! parsing never fails on an unrecognised algorithm name (the grammar is
//! generic), but verifying content against a digest requires the algorithm
//! to be registered. SHA-256 is always registered; other algorithms can be
//! added via [`AlgorithmRegistry::register`].

use crate::error::{Error, Result};
use sha2::{Digest as _, Sha256, Sha512};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;


/// A parsed content digest of shape `<algorithm>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: String,
    hex: String,
}

impl Digest {
    /// Returns the algorithm component (e.g. `"sha256"`).
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the hex-encoded value component.
    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Computes the SHA-256 digest of `bytes`.
    ///
    /// # Examples
    ///
    /// ```
    /// use orex::digest::Digest;
    ///
    /// let d = Digest::sha256(b"hello world");
    /// assert_eq!(d.algorithm(), "sha256");
    /// ```
    pub fn sha256(bytes: &[u8]) -> Self {
        let hex = hex_encode(&Sha256::digest(bytes));
        Digest {
            algorithm: "sha256".to_string(),
            hex,
        }
    }

    /// Verifies `bytes` against this digest using `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if the algorithm is not registered, or
    /// [`Error::DigestMismatch`] if the computed digest differs.
    pub fn verify(&self, bytes: &[u8], registry: &AlgorithmRegistry) -> Result<()> {
        let algorithm = registry.get(&self.algorithm).ok_or_else(|| {
            Error::unsupported(format!("digest algorithm {:?} is not registered", self.algorithm))
        })?;
        let actual_hex = algorithm.digest_hex(bytes);
        if actual_hex == self.hex {
            Ok(())
        } else {
            Err(Error::digest_mismatch(
                self.to_string(),
                format!("{}:{}", self.algorithm, actual_hex),
            ))
        }
    }
}

impl FromStr for Digest {
    type Err = Error;

    /// Parses `<algorithm>:<hex>`. The algorithm component must be lowercase
    /// alphanumerics optionally separated by `+`, `.`, `_`, or `-`; the hex
    /// component must be non-empty lowercase hex digits.
    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, hex) = s
            .split_once(':')
            .ok_or_else(|| Error::invalid_reference(s, "digest must contain ':'"))?;

        if algorithm.is_empty() || !algorithm.chars().all(is_algorithm_char) {
            return Err(Error::invalid_reference(s, "invalid digest algorithm component"));
        }
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()) {
            return Err(Error::invalid_reference(s, "invalid digest hex component"));
        }

        Ok(Digest {
            algorithm: algorithm.to_string(),
            hex: hex.to_string(),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

impl serde::Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_str(&s).map_err(serde::de::Error::custom)
    }
}

fn is_algorithm_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-')
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(out, "{b:02x}").expect("writing to a String never fails");
    }
    out
}

/// A verifier for one digest algorithm: knows how to hash content and how
/// long the resulting hex string should be.
pub trait Algorithm: Send + Sync {
    fn hex_len(&self) -> usize;
    fn digest_hex(&self, bytes: &[u8]) -> String;
}

struct Sha256Algorithm;
impl Algorithm for Sha256Algorithm {
    fn hex_len(&self) -> usize {
        64
    }
    fn digest_hex(&self, bytes: &[u8]) -> String {
        hex_encode(&Sha256::digest(bytes))
    }
}

struct Sha512Algorithm;
impl Algorithm for Sha512Algorithm {
    fn hex_len(&self) -> usize {
        128
    }
    fn digest_hex(&self, bytes: &[u8]) -> String {
        hex_encode(&Sha512::digest(bytes))
    }
}

/// A table of registered digest algorithms, used to decide whether a digest
/// can be verified and, if so, how.
///
/// SHA-256 is always present; [`AlgorithmRegistry::default`] also registers
/// SHA-512, matching the common set of algorithms advertised by registries
/// today. Callers that need an exotic algorithm can [`register`](Self::register)
/// their own [`Algorithm`] implementation.
pub struct AlgorithmRegistry {
    algorithms: HashMap<String, Arc<dyn Algorithm>>,
}

impl AlgorithmRegistry {
    /// An empty registry with only the mandatory SHA-256 baseline present.
    pub fn baseline() -> Self {
        let mut algorithms: HashMap<String, Arc<dyn Algorithm>> = HashMap::new();
        algorithms.insert("sha256".to_string(), Arc::new(Sha256Algorithm));
        AlgorithmRegistry { algorithms }
    }

    /// Registers an additional algorithm under `name`, overwriting any
    /// previous registration for that name.
    pub fn register(&mut self, name: impl Into<String>, algorithm: impl Algorithm + 'static) {
        self.algorithms.insert(name.into(), Arc::new(algorithm));
    }

    /// Returns the verifier for `name`, if registered.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Algorithm>> {
        self.algorithms.get(name).cloned()
    }

    /// `true` if `name` is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.algorithms.contains_key(name)
    }
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        let mut registry = Self::baseline();
        registry.register("sha512", Sha512Algorithm);
        registry
    }
}

/// An incremental digest computation, used to verify a streamed body against
/// a [`Digest`] without buffering the whole body in memory first.
///
/// SHA-256 and SHA-512 hash incrementally as chunks arrive; any other
/// registered [`Algorithm`] has no streaming form, so its hasher falls back
/// to buffering the chunks and hashing the whole thing on [`finish_hex`](Self::finish_hex).
pub enum Hasher {
    Sha256(Box<Sha256>),
    Sha512(Box<Sha512>),
    Buffered { algorithm: Arc<dyn Algorithm>, buf: Vec<u8> },
}

impl Hasher {
    /// Feeds `bytes` into the running hash.
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(bytes),
            Hasher::Sha512(h) => h.update(bytes),
            Hasher::Buffered { buf, .. } => buf.extend_from_slice(bytes),
        }
    }

    /// Consumes the hasher and returns the lowercase hex digest.
    pub fn finish_hex(self) -> String {
        match self {
            Hasher::Sha256(h) => hex_encode(&h.finalize()),
            Hasher::Sha512(h) => hex_encode(&h.finalize()),
            Hasher::Buffered { algorithm, buf } => algorithm.digest_hex(&buf),
        }
    }
}

impl AlgorithmRegistry {
    /// Returns an incremental [`Hasher`] for `name`, or `None` if `name`
    /// isn't registered.
    pub fn hasher(&self, name: &str) -> Option<Hasher> {
        match name {
            "sha256" if self.is_registered("sha256") => Some(Hasher::Sha256(Box::new(Sha256::new()))),
            "sha512" if self.is_registered("sha512") => Some(Hasher::Sha512(Box::new(Sha512::new()))),
            other => self.get(other).map(|algorithm| Hasher::Buffered {
                algorithm,
                buf: Vec::new(),
            }),
        }
    }
}
