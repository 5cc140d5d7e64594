//! Key lifecycle engine.
//!
//! Stateless decision logic over the license store. Every operation takes a
//! connection (usually pooled) and, where time matters, the current unix
//! timestamp so callers and tests control the clock.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries::{self, Guard, Mutation};
use crate::db::with_transaction;
use crate::error::{AppError, Result};
use crate::models::{Acceptance, Decision, DurationPolicy, LicenseKey, RejectReason};
use crate::util::{days_to_seconds, normalize, normalize_opt};

/// Fresh tokens tried per record before a generate call gives up on a collision.
const MAX_KEY_ATTEMPTS: usize = 5;

fn gen_key() -> String {
    Uuid::new_v4().to_string()
}

/// `base` moved by `days`, rejecting results that do not fit in an `i64`.
fn shift_by_days(base: i64, days: i64) -> Result<i64> {
    days_to_seconds(days)
        .and_then(|seconds| base.checked_add(seconds))
        .ok_or_else(|| AppError::BadRequest("days out of range".into()))
}

fn require<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    normalize(value).ok_or_else(|| AppError::BadRequest(format!("{} must not be empty", field)))
}

/// Reason a key may not be used right now, checked in order: disabled, then expired.
fn usability(license: &LicenseKey, now: i64) -> Option<RejectReason> {
    if !license.active {
        Some(RejectReason::Disabled)
    } else if license.is_expired_at(now) {
        Some(RejectReason::Expired)
    } else {
        None
    }
}

/// Mint `count` new keys sharing one expiry computed from `policy` at `now`.
pub fn generate(
    conn: &mut Connection,
    count: i64,
    policy: DurationPolicy,
    max_count: u32,
    now: i64,
) -> Result<Vec<String>> {
    generate_with(conn, count, policy, max_count, now, gen_key)
}

/// [`generate`] with a caller-supplied token source.
///
/// A token that collides with an existing key is replaced by the next one from
/// `next_key`; the batch only fails if a single record collides
/// `MAX_KEY_ATTEMPTS` times in a row.
pub fn generate_with<F>(
    conn: &mut Connection,
    count: i64,
    policy: DurationPolicy,
    max_count: u32,
    now: i64,
    mut next_key: F,
) -> Result<Vec<String>>
where
    F: FnMut() -> String,
{
    if count < 1 {
        return Err(AppError::BadRequest("count must be at least 1".into()));
    }
    if count > i64::from(max_count) {
        return Err(AppError::BadRequest(format!(
            "count must be at most {}",
            max_count
        )));
    }
    if let DurationPolicy::Days(days) = policy
        && days <= 0
    {
        return Err(AppError::BadRequest("days must be positive".into()));
    }

    let expires_at = policy.expires_at(now)?;

    let keys = with_transaction(conn, |tx| {
        let mut keys = Vec::new();
        for _ in 0..count {
            let mut attempt = 0;
            let key = loop {
                let license = LicenseKey {
                    key: next_key(),
                    hwid: None,
                    expires_at,
                    active: true,
                    name: None,
                    created_at: now,
                };
                match queries::insert_license_key(tx, &license) {
                    Ok(()) => break license.key,
                    Err(AppError::DuplicateKey(key)) if attempt + 1 < MAX_KEY_ATTEMPTS => {
                        tracing::warn!("Generated key collided, retrying: {}", key);
                        attempt += 1;
                    }
                    Err(e) => return Err(e),
                }
            };
            keys.push(key);
        }
        Ok(keys)
    })?;

    tracing::info!(
        "Generated {} license key(s), expires_at={:?}",
        keys.len(),
        expires_at
    );
    Ok(keys)
}

/// Validate `key` for the device `hwid`, binding the device on first use.
///
/// Checks run in a fixed order: unknown key, disabled, expired, then the
/// binding rules. `name` is recorded on the key if it has none yet.
pub fn validate(
    conn: &Connection,
    key: &str,
    hwid: &str,
    name: Option<&str>,
    now: i64,
) -> Result<Decision> {
    let hwid = require(hwid, "hwid")?;
    let name = normalize_opt(name);
    let Some(key) = normalize(key) else {
        return Ok(Decision::Rejected(RejectReason::InvalidKey));
    };

    let Some(license) = queries::get_license_key(conn, key)? else {
        tracing::debug!("Validation rejected: unknown key");
        return Ok(Decision::Rejected(RejectReason::InvalidKey));
    };

    if let Some(reason) = usability(&license, now) {
        tracing::debug!("Validation rejected for {}: {}", key, reason.as_ref());
        return Ok(Decision::Rejected(reason));
    }

    match license.hwid.as_deref() {
        None => bind(conn, key, hwid, name, now),
        Some(bound) => confirm(conn, key, bound, hwid, name),
    }
}

/// First use of an unbound key.
fn bind(
    conn: &Connection,
    key: &str,
    hwid: &str,
    name: Option<&str>,
    now: i64,
) -> Result<Decision> {
    // One device may not silently collect several keys
    if let Some(owner) = queries::get_license_key_by_hwid(conn, hwid)?
        && owner.key != key
    {
        tracing::warn!("HWID {} already bound to another key, refusing {}", hwid, key);
        return Ok(Decision::Rejected(RejectReason::HwidConflict));
    }

    // Usability is re-checked in the write so a concurrent disable cannot be bound past
    let guards = [Guard::HwidUnbound, Guard::Active, Guard::NotExpiredAt(now)];
    match queries::update_if(conn, key, &guards, Mutation::Bind { hwid, name }) {
        Ok(true) => {
            tracing::info!("License key {} bound to HWID {}", key, hwid);
            Ok(Decision::Accepted(Acceptance::BoundNow))
        }
        // The key changed between our read and write: bound, disabled or deleted
        Ok(false) => {
            let Some(current) = queries::get_license_key(conn, key)? else {
                return Ok(Decision::Rejected(RejectReason::InvalidKey));
            };
            if let Some(reason) = usability(&current, now) {
                return Ok(Decision::Rejected(reason));
            }
            match current.hwid.as_deref() {
                Some(bound) => confirm(conn, key, bound, hwid, name),
                None => Err(AppError::Internal(format!(
                    "conditional bind of {} matched no row but key is usable and unbound",
                    key
                ))),
            }
        }
        Err(AppError::Conflict(_)) => {
            tracing::warn!("HWID {} claimed concurrently by another key", hwid);
            Ok(Decision::Rejected(RejectReason::HwidConflict))
        }
        Err(e) => Err(e),
    }
}

/// Subsequent use of a bound key.
fn confirm(
    conn: &Connection,
    key: &str,
    bound: &str,
    hwid: &str,
    name: Option<&str>,
) -> Result<Decision> {
    if bound != hwid {
        tracing::debug!("Validation rejected for {}: HWID mismatch", key);
        return Ok(Decision::Rejected(RejectReason::HwidMismatch));
    }

    if let Some(name) = name {
        queries::update_if(
            conn,
            key,
            &[Guard::HwidEquals(hwid), Guard::NameUnset],
            Mutation::SetName(name),
        )?;
    }

    Ok(Decision::Accepted(Acceptance::AlreadyBound))
}

/// Log in by device alone, returning the key bound to `hwid`.
pub fn auto_login(conn: &Connection, hwid: &str, now: i64) -> Result<Decision> {
    let Some(hwid) = normalize(hwid) else {
        return Ok(Decision::Rejected(RejectReason::NoBinding));
    };

    let Some(license) = queries::get_license_key_by_hwid(conn, hwid)? else {
        return Ok(Decision::Rejected(RejectReason::NoBinding));
    };

    if let Some(reason) = usability(&license, now) {
        return Ok(Decision::Rejected(reason));
    }

    Ok(Decision::Accepted(Acceptance::Login { key: license.key }))
}

/// Push a key's expiry by `days` (negative shortens). A key that never expired
/// becomes finite, expiring `days` from `now`. Returns the new expiry.
pub fn extend(conn: &mut Connection, key: &str, days: i64, now: i64) -> Result<i64> {
    let key = require(key, "key")?;

    let expires_at = with_transaction(conn, |tx| {
        let license = queries::get_license_key(tx, key)?
            .ok_or_else(|| AppError::NotFound("License key not found".into()))?;
        let expires_at = shift_by_days(license.expires_at.unwrap_or(now), days)?;
        queries::update(tx, key, Mutation::SetExpiry(expires_at))?;
        Ok(expires_at)
    })?;

    tracing::info!("Extended {} by {} day(s), now expires at {}", key, days, expires_at);
    Ok(expires_at)
}

/// Shift every active, finite key by `days` in one transaction.
/// Infinite and disabled keys are left alone. Returns the number shifted.
pub fn compensate(conn: &mut Connection, days: i64) -> Result<usize> {
    let seconds = days_to_seconds(days)
        .ok_or_else(|| AppError::BadRequest("days out of range".into()))?;

    let updated = with_transaction(conn, |tx| {
        // Every shifted expiry must stay an integer, so check both extremes first
        if let Some((earliest, latest)) = queries::active_expiry_range(tx)? {
            shift_by_days(earliest, days)?;
            shift_by_days(latest, days)?;
        }
        queries::shift_active_expiries(tx, seconds)
    })?;
    tracing::info!("Compensated {} license key(s) by {} day(s)", updated, days);
    Ok(updated)
}

pub fn enable(conn: &Connection, key: &str) -> Result<()> {
    set_active(conn, key, true)
}

pub fn disable(conn: &Connection, key: &str) -> Result<()> {
    set_active(conn, key, false)
}

fn set_active(conn: &Connection, key: &str, active: bool) -> Result<()> {
    let key = require(key, "key")?;
    queries::update(conn, key, Mutation::SetActive(active))?;
    tracing::info!("License key {} active={}", key, active);
    Ok(())
}

/// Permanently remove a key; its device becomes free for another key.
pub fn delete(conn: &Connection, key: &str) -> Result<()> {
    let key = require(key, "key")?;
    queries::delete_license_key(conn, key)?;
    tracing::info!("Deleted license key {}", key);
    Ok(())
}

/// Overwrite a key's display name.
pub fn set_name(conn: &Connection, key: &str, name: &str) -> Result<()> {
    let key = require(key, "key")?;
    let name = require(name, "name")?;
    queries::update(conn, key, Mutation::SetName(name))?;
    Ok(())
}

pub fn list(conn: &Connection) -> Result<Vec<LicenseKey>> {
    queries::list_license_keys(conn)
}
