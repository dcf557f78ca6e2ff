//! Newtype IDs for type-safe identification of scene elements.
//!
//! Objects and annotations are both keyed by UUID; wrapping them prevents
//! passing an annotation UUID where an object UUID is expected.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a tracked object in the scene.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    /// Creates a new ObjectId.
    #[inline]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ObjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for ObjectId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A unique identifier for an annotation within a frame.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(pub Uuid);

impl AnnotationId {
    /// Creates a new AnnotationId.
    #[inline]
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Debug for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnnotationId({})", self.0)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AnnotationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for AnnotationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A deterministic stream of version 4 UUIDs.
///
/// The same seed always yields the same sequence, which keeps builder-made
/// scenes and reader-minted ids reproducible across runs.
#[derive(Debug, Clone)]
pub struct UuidStream {
    rng: StdRng,
}

impl UuidStream {
    /// Creates a stream seeded with `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns the next UUID of the stream.
    pub fn next_uuid(&mut self) -> Uuid {
        let bits: u128 = self.rng.random();
        uuid::Builder::from_random_bytes(bits.to_le_bytes()).into_uuid()
    }
}

impl Default for UuidStream {
    fn default() -> Self {
        Self::seeded(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_equality() {
        let uuid = Uuid::nil();
        assert_eq!(ObjectId(uuid), ObjectId(uuid));
        assert_ne!(ObjectId(uuid), ObjectId(Uuid::from_u128(1)));
    }

    #[test]
    fn test_id_parse() {
        let id: AnnotationId = "78f0ad89-2750-4a30-9d66-44c9da73a714".parse().unwrap();
        assert_eq!(id.to_string(), "78f0ad89-2750-4a30-9d66-44c9da73a714");
        assert!("not-a-uuid".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_stream_is_deterministic() {
        let mut a = UuidStream::seeded(7);
        let mut b = UuidStream::seeded(7);
        for _ in 0..5 {
            assert_eq!(a.next_uuid(), b.next_uuid());
        }
    }

    #[test]
    fn test_stream_yields_v4() {
        let mut stream = UuidStream::default();
        let uuid = stream.next_uuid();
        assert_eq!(uuid.get_version_num(), 4);
        assert_ne!(uuid, stream.next_uuid());
    }
}
