use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::util::days_to_seconds;

/// A license key and its device binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseKey {
    pub key: String,
    /// Device this key is bound to (None = not yet bound)
    pub hwid: Option<String>,
    /// Unix timestamp the key stops validating at (None = never expires)
    pub expires_at: Option<i64>,
    pub active: bool,
    /// Display label, usually the user name reported on first bind
    pub name: Option<String>,
    pub created_at: i64,
}

impl LicenseKey {
    /// A key is expired once `now` reaches its expiry; the expiry second itself is not valid.
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(exp) if exp <= now)
    }

    pub fn is_bound(&self) -> bool {
        self.hwid.is_some()
    }
}

/// How long a freshly generated batch of keys stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationPolicy {
    Infinite,
    Days(i64),
}

impl DurationPolicy {
    /// `None` on the wire means the keys never expire.
    pub fn from_days(days: Option<i64>) -> Self {
        match days {
            Some(days) => DurationPolicy::Days(days),
            None => DurationPolicy::Infinite,
        }
    }

    /// Expiry timestamp for a key minted at `now`. Fails when the
    /// timestamp does not fit in an `i64`.
    pub fn expires_at(self, now: i64) -> Result<Option<i64>> {
        match self {
            DurationPolicy::Infinite => Ok(None),
            DurationPolicy::Days(days) => days_to_seconds(days)
                .and_then(|seconds| now.checked_add(seconds))
                .map(Some)
                .ok_or_else(|| AppError::BadRequest("days out of range".into())),
        }
    }
}
