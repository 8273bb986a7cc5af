use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::RecordError;

const ID_BYTES: usize = 12;

/// 12-byte record identifier, written as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId([u8; ID_BYTES]);

impl RecordId {
    /// Accepts exactly 24 hex characters, in either case.
    pub fn parse(raw: &str) -> Result<Self, RecordError> {
        if raw.len() != ID_BYTES * 2 {
            return Err(RecordError::InvalidRecordId);
        }
        let mut bytes = [0u8; ID_BYTES];
        hex::decode_to_slice(raw, &mut bytes).map_err(|_| RecordError::InvalidRecordId)?;
        Ok(Self(bytes))
    }

    /// Seconds timestamp (big-endian), 5 random bytes, then a 3-byte counter.
    pub fn generate() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or_default();
        let random: [u8; 5] = rand::random();
        let count = COUNTER
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(u32::from(rand::random::<u16>()));

        let mut bytes = [0u8; ID_BYTES];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RecordId {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_hex()
    }
}
