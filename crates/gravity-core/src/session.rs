use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::unix_millis_now;

/// Maximum accepted length of a session id supplied by a client.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque control-center session identifier.
///
/// Minted ids are `<millis base36>-<12 hex chars>`: unique in practice, not
/// unguessable. Ids arriving from clients are accepted as long as they are
/// short and URL-safe, since any id may open a control center.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh id from the current time and a random suffix.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}-{}",
            to_base36(unix_millis_now()),
            &suffix[..12]
        ))
    }

    /// Validate a client-supplied id.
    pub fn parse(raw: &str) -> Result<Self, InvalidSessionId> {
        if raw.is_empty() {
            return Err(InvalidSessionId::Empty);
        }
        if raw.len() > MAX_SESSION_ID_LEN {
            return Err(InvalidSessionId::TooLong(raw.len()));
        }
        if let Some(c) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(InvalidSessionId::BadCharacter(c));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reasons a client-supplied session id is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidSessionId {
    Empty,
    TooLong(usize),
    BadCharacter(char),
}

impl std::fmt::Display for InvalidSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "session id is empty"),
            Self::TooLong(len) => {
                write!(f, "session id exceeds {MAX_SESSION_ID_LEN} chars ({len})")
            },
            Self::BadCharacter(c) => write!(f, "session id contains invalid character {c:?}"),
        }
    }
}

fn to_base36(mut n: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
