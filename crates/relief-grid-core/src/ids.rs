//! Strongly-typed identifiers for relief-grid entities.
//!
//! Disaster, task, and resource records are created by external pipelines
//! and carry UUID identity. Messages carry a 32-byte blake3 id derived from
//! their room and sequence number. Actors are identified by the opaque uid
//! the identity provider places in the session token.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors from parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The string is not a valid UUID.
    #[error("invalid uuid: {0}")]
    InvalidUuid(String),

    /// The string is not valid hex of the expected length.
    #[error("invalid hex identifier")]
    InvalidHex,

    /// An actor uid must be non-empty.
    #[error("empty actor id")]
    EmptyActorId,

    /// The room string is neither `global` nor a disaster UUID.
    #[error("invalid room: {0}")]
    InvalidRoom(String),
}

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Build from raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(uuid::Uuid::from_bytes(bytes))
            }

            /// Return the underlying bytes.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| IdError::InvalidUuid(s.to_string()))
            }
        }
    };
}

uuid_id! {
    /// Identifier of a disaster record, assigned at report ingestion.
    DisasterId
}

uuid_id! {
    /// Identifier of a task record.
    TaskId
}

uuid_id! {
    /// Identifier of a resource record.
    ResourceId
}

/// A 32-byte message identifier, derived via blake3 from the room, the
/// sequence number, and the creation timestamp. Hex-encoded for display.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId([u8; 32]);

impl MessageId {
    /// Create a `MessageId` from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the id of the message at `sequence` in `room`.
    #[must_use]
    pub fn derive(room: &RoomId, sequence: u64, created_at_nanos: i64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(room.to_string().as_bytes());
        hasher.update(&sequence.to_le_bytes());
        hasher.update(&created_at_nanos.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Parse a `MessageId` from a hex string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let bytes = hex::decode(s).map_err(|_| IdError::InvalidHex)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| IdError::InvalidHex)?;
        Ok(Self(arr))
    }

    /// Return the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the hex-encoded representation.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.to_hex())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for MessageId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.to_hex()
    }
}

/// The opaque uid of a participant, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Create an actor id from a non-empty uid string.
    ///
    /// # Errors
    ///
    /// Returns `IdError::EmptyActorId` if the uid is empty or whitespace.
    pub fn new(uid: impl Into<String>) -> Result<Self, IdError> {
        let uid = uid.into();
        if uid.trim().is_empty() {
            return Err(IdError::EmptyActorId);
        }
        Ok(Self(uid))
    }

    /// Return the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ActorId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// The namespace key of a message room.
///
/// Every disaster owns its own fully-partitioned room; messages without a
/// disaster go to the single global room. The wire form is either the
/// literal `global` or a disaster UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomId {
    /// The ungrouped room shared by all participants.
    Global,
    /// The room scoped to one disaster.
    Disaster(DisasterId),
}

impl RoomId {
    /// Literal wire form of the global room.
    pub const GLOBAL: &'static str = "global";
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "{}", Self::GLOBAL),
            Self::Disaster(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for RoomId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::GLOBAL {
            return Ok(Self::Global);
        }
        s.parse::<DisasterId>()
            .map(Self::Disaster)
            .map_err(|_| IdError::InvalidRoom(s.to_string()))
    }
}

impl TryFrom<String> for RoomId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomId> for String {
    fn from(room: RoomId) -> Self {
        room.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disaster_id_roundtrip() {
        let id = DisasterId::generate();
        let parsed: DisasterId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn disaster_id_rejects_garbage() {
        assert!(matches!(
            "not-a-uuid".parse::<DisasterId>(),
            Err(IdError::InvalidUuid(_))
        ));
    }

    #[test]
    fn message_id_is_deterministic() {
        let room = RoomId::Disaster(DisasterId::from_bytes([7u8; 16]));
        let a = MessageId::derive(&room, 1, 1_000);
        let b = MessageId::derive(&room, 1, 1_000);
        assert_eq!(a, b);

        let c = MessageId::derive(&room, 2, 1_000);
        assert_ne!(a, c);
    }

    #[test]
    fn message_id_hex_roundtrip() {
        let id = MessageId::from_bytes([9u8; 32]);
        assert_eq!(MessageId::from_hex(&id.to_hex()).unwrap(), id);
        assert!(MessageId::from_hex("zz").is_err());
    }

    #[test]
    fn actor_id_rejects_empty() {
        assert!(matches!(ActorId::new("  "), Err(IdError::EmptyActorId)));
        assert_eq!(ActorId::new("vol@relief.example").unwrap().as_str(), "vol@relief.example");
    }

    #[test]
    fn room_parsing() {
        assert_eq!("global".parse::<RoomId>().unwrap(), RoomId::Global);

        let id = DisasterId::generate();
        assert_eq!(
            id.to_string().parse::<RoomId>().unwrap(),
            RoomId::Disaster(id)
        );

        assert!(matches!(
            "nope".parse::<RoomId>(),
            Err(IdError::InvalidRoom(_))
        ));
    }

    #[test]
    fn room_serde_wire_form() {
        let json = serde_json::to_string(&RoomId::Global).unwrap();
        assert_eq!(json, "\"global\"");
        let back: RoomId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, RoomId::Global);
    }
}
