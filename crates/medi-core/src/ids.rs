//! Opaque, hex-encoded content identifiers shared across every component.
//!
//! All of them are 32-byte SHA-256 digests (spec.md §3: `hash =
//! SHA256(...)`). The newtype wrapper exists so a `Hash<Intent>` and a
//! `Hash<Settlement>` can never be mixed up at a call site, mirroring
//! `chronx-core::types::{AccountId, TxId}`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! hash_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn from_bytes(b: [u8; 32]) -> Self {
                Self(b)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let bytes = hex::decode(s)?;
                let mut arr = [0u8; 32];
                if bytes.len() == 32 {
                    arr.copy_from_slice(&bytes);
                }
                Ok(Self(arr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}..)", stringify!($name), &self.to_hex()[..8])
            }
        }
    };
}

hash_id!(IntentHash, "32-byte SHA-256 identifying an Intent.");
hash_id!(SettlementHashId, "32-byte SHA-256 over a ProposedSettlement's canonical fields.");
hash_id!(ReceiptHashId, "32-byte SHA-256 over a Receipt's canonical fields.");
hash_id!(SnapshotHash, "32-byte SHA-256 over a frozen item's snapshot.");
hash_id!(PackageHash, "32-byte SHA-256 over a DisputePackage's canonical subset.");
hash_id!(SignalHash, "32-byte SHA-256 over a raw activity signal's content.");

/// Opaque string identifiers: these don't have a fixed hash shape in
/// spec.md §3 (settlement/claim/dispute ids are "opaque tokens"), so they
/// stay plain `String` newtypes rather than fixed-width hashes.
macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(SettlementId, "Opaque settlement identifier.");
string_id!(MediatorId, "Opaque mediator identifier (hex SHA-256 of its public key).");
string_id!(ClaimId, "Opaque work-claim identifier.");
string_id!(DisputeId, "Opaque dispute identifier.");
string_id!(ResolutionId, "Opaque resolution identifier.");
string_id!(SegmentId, "Opaque activity-segment identifier.");
string_id!(ReceiptId, "Receipt identifier: `uuid-‖-firstSignalHash[0..8]`.");
string_id!(DepositId, "Opaque deposit identifier.");
string_id!(BurnRecordId, "Opaque burn-record identifier.");
string_id!(Author, "Opaque author identifier (account/public-key reference).");
string_id!(ChallengeId, "Opaque challenge identifier.");
string_id!(VerificationRequestId, "Opaque semantic-consensus verification-request identifier.");
