use std::fmt;
use time::Duration;

pub const OTP_TIME_TO_LIVE: Duration = Duration::minutes(15);
pub const OTP_CODE_LENGTH: usize = 6;

/// A freshly issued code. Only `hash` and `exp` are ever persisted; `code`
/// goes to the recipient and is dropped.
#[derive(Clone)]
pub struct OneTimePasswordPacket {
    pub code: String,
    pub hash: String,
    /// Unix milliseconds.
    pub exp: i64,
}

impl OneTimePasswordPacket {
    pub fn expires_at_seconds(&self) -> i64 {
        self.exp.div_euclid(1000)
    }
}

impl fmt::Debug for OneTimePasswordPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneTimePasswordPacket")
            .field("code", &"******")
            .field("hash", &self.hash)
            .field("exp", &self.exp)
            .finish()
    }
}

/// Stored shape, keyed by email or E.164 phone number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimePasswordRecord {
    pub identifier: String,
    pub hash: String,
    /// Unix seconds.
    pub expires_at: i64,
}

impl OneTimePasswordRecord {
    pub fn is_live_at(&self, now: i64) -> bool {
        self.expires_at > now
    }
}
