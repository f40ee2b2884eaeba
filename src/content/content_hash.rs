use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub const HASH_LEN: usize = 32;

/// SHA-256 of the raw markdown bytes of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContentHash(pub [u8; HASH_LEN]);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> ContentHash {
        ContentHash(Sha256::digest(bytes).into())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl FromStr for ContentHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != HASH_LEN * 2 || !s.is_ascii() {
            return Err(format!("Invalid content hash length: {}", s));
        }

        let mut bytes = [0u8; HASH_LEN];
        for (i, b) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *b = u8::from_str_radix(pair, 16)
                .map_err(|_| format!("Invalid hex digit in content hash: {}", s))?;
        }
        Ok(ContentHash(bytes))
    }
}

impl Serialize for ContentHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
    {
        use serde::de::Error;
        let value = String::deserialize(deserializer)?;
        ContentHash::from_str(&value).map_err(Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let hash = ContentHash::of(b"");
        assert_eq!(hash.to_string(), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn test_single_byte_change() {
        let a = ContentHash::of(b"Hello world.");
        let b = ContentHash::of(b"Hello world!");
        assert_ne!(a, b);
        assert_eq!(a, ContentHash::of(b"Hello world."));
    }

    #[test]
    fn test_parse_hex() {
        let hash = ContentHash::of(b"some post");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(parsed, hash);

        assert!("abc".parse::<ContentHash>().is_err());
        let not_hex = "zz".repeat(HASH_LEN);
        assert!(not_hex.parse::<ContentHash>().is_err());
    }
}
