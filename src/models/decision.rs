use serde::Serialize;
use strum::AsRefStr;

/// Why a validate or auto-login attempt was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    InvalidKey,
    Disabled,
    Expired,
    /// The device already owns a different key
    HwidConflict,
    /// The key is bound to a different device
    HwidMismatch,
    NoBinding,
}

impl RejectReason {
    pub fn message(self) -> &'static str {
        match self {
            RejectReason::InvalidKey => "Invalid license key",
            RejectReason::Disabled => "License key is disabled",
            RejectReason::Expired => "License key has expired",
            RejectReason::HwidConflict => "This HWID is already bound to a different key",
            RejectReason::HwidMismatch => "HWID does not match the license key",
            RejectReason::NoBinding => "No key bound to this HWID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    /// This call claimed the key for the device
    BoundNow,
    AlreadyBound,
    /// Auto-login found the key bound to the device
    Login { key: String },
}

/// Outcome of a validate or auto-login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accepted(Acceptance),
    Rejected(RejectReason),
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            Decision::Accepted(Acceptance::BoundNow) => "License key validated and HWID bound",
            Decision::Accepted(Acceptance::AlreadyBound) => "License key and HWID validated",
            Decision::Accepted(Acceptance::Login { .. }) => "Auto-login successful",
            Decision::Rejected(reason) => reason.message(),
        }
    }
}
