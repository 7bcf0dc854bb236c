use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SEQ_SPACE: u32 = 36 * 36 * 36;
const RAND_SPACE: u32 = 36 * 36 * 36 * 36;

static UID_SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Opaque row identity. Unique within a process, stable across edits and
/// reorders; a new uid is minted only when a fresh sentinel row is created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct VariableUid(String);

impl VariableUid {
    /// Mint a new uid from the current time plus a process-local sequence and
    /// random suffix. The sequence keeps uids unique even when the clock or
    /// the randomness source misbehaves.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let seq = UID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0_u8; 4];
        let sample = match getrandom::getrandom(&mut bytes) {
            Ok(()) => u32::from_le_bytes(bytes),
            Err(_) => seq.wrapping_mul(2_654_435_761),
        };
        Self(format!(
            "var-{}-{}{}",
            base36_encode_u64(millis),
            base36_encode_fixed_u32(seq % SEQ_SPACE, 3),
            base36_encode_fixed_u32(sample % RAND_SPACE, 4),
        ))
    }

    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("variable uid must be non-empty".to_string());
        }
        if raw.chars().any(char::is_whitespace) {
            return Err("variable uid must not contain whitespace".to_string());
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VariableUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::borrow::Borrow<str> for VariableUid {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for VariableUid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl<'de> Deserialize<'de> for VariableUid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .map_err(|err| D::Error::custom(format!("invalid variable uid `{raw}`: {err}")))
    }
}

fn base36_encode_u64(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while value > 0 {
        chars.push(BASE36_ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    chars.into_iter().rev().collect()
}

fn base36_encode_fixed_u32(mut value: u32, width: usize) -> String {
    let mut chars = vec!['0'; width];
    for idx in (0..width).rev() {
        chars[idx] = BASE36_ALPHABET[(value % 36) as usize] as char;
        value /= 36;
    }
    chars.into_iter().collect()
}
