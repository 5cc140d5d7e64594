//! License store: every read and write against the `license_keys` table.
//!
//! Writes that depend on current state go through [`update_if`], which folds
//! the precondition into the `WHERE` clause so check and write are one
//! statement.

use rusqlite::{Connection, OptionalExtension, params, types::Value};

use crate::error::{AppError, Result, is_constraint_violation};
use crate::models::LicenseKey;

use super::from_row::{FromRow, LICENSE_KEY_COLS, query_all, query_one};

/// Precondition a row must meet for a conditional update to apply.
#[derive(Debug, Clone, Copy)]
pub enum Guard<'a> {
    HwidUnbound,
    HwidEquals(&'a str),
    NameUnset,
    Active,
    /// The key has no expiry or expires strictly after the given timestamp.
    NotExpiredAt(i64),
}

impl Guard<'_> {
    fn condition(self) -> (&'static str, Option<Value>) {
        match self {
            Guard::HwidUnbound => ("hwid IS NULL", None),
            Guard::HwidEquals(hwid) => ("hwid = ?", Some(Value::Text(hwid.to_string()))),
            Guard::NameUnset => ("name IS NULL", None),
            Guard::Active => ("active = 1", None),
            Guard::NotExpiredAt(now) => (
                "(expires_at IS NULL OR expires_at > ?)",
                Some(Value::Integer(now)),
            ),
        }
    }
}

/// A change to a single license key row.
#[derive(Debug, Clone, Copy)]
pub enum Mutation<'a> {
    /// Claim a device; fills the name only if the row has none yet.
    Bind { hwid: &'a str, name: Option<&'a str> },
    SetName(&'a str),
    SetActive(bool),
    SetExpiry(i64),
}

impl Mutation<'_> {
    fn assignment(self) -> (&'static str, Vec<Value>) {
        match self {
            Mutation::Bind { hwid, name } => (
                "hwid = ?, name = COALESCE(name, ?)",
                vec![Value::Text(hwid.to_string()), name.map(String::from).into()],
            ),
            Mutation::SetName(name) => ("name = ?", vec![Value::Text(name.to_string())]),
            Mutation::SetActive(active) => ("active = ?", vec![Value::Integer(active.into())]),
            Mutation::SetExpiry(expires_at) => {
                ("expires_at = ?", vec![Value::Integer(expires_at)])
            }
        }
    }
}

/// Map UNIQUE violations on `hwid` to a conflict the engine can act on.
fn hwid_conflict(err: rusqlite::Error) -> AppError {
    if is_constraint_violation(&err) {
        AppError::Conflict("HWID is already bound to a different key".into())
    } else {
        err.into()
    }
}

/// Insert a new license key. Fails with `DuplicateKey` if the key already exists.
pub fn insert_license_key(conn: &Connection, license: &LicenseKey) -> Result<()> {
    conn.execute(
        "INSERT INTO license_keys (key, hwid, expires_at, active, name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            &license.key,
            &license.hwid,
            license.expires_at,
            license.active,
            &license.name,
            license.created_at
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            AppError::DuplicateKey(license.key.clone())
        } else {
            e.into()
        }
    })?;
    Ok(())
}

pub fn get_license_key(conn: &Connection, key: &str) -> Result<Option<LicenseKey>> {
    query_one(
        conn,
        &format!("SELECT {} FROM license_keys WHERE key = ?1", LICENSE_KEY_COLS),
        &[&key],
    )
}

/// Look up the key a device is bound to, if any.
pub fn get_license_key_by_hwid(conn: &Connection, hwid: &str) -> Result<Option<LicenseKey>> {
    query_one(
        conn,
        &format!("SELECT {} FROM license_keys WHERE hwid = ?1", LICENSE_KEY_COLS),
        &[&hwid],
    )
}

/// All license keys, oldest first (batch order preserved within a generate call).
pub fn list_license_keys(conn: &Connection) -> Result<Vec<LicenseKey>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM license_keys ORDER BY created_at, rowid",
            LICENSE_KEY_COLS
        ),
        &[],
    )
}

/// Atomically apply `mutation` to `key` only if every guard holds.
///
/// Returns `Ok(false)` when the key is missing or a guard failed; the caller
/// re-reads to find out which. A bind that would duplicate another key's
/// hwid fails with `AppError::Conflict`.
pub fn update_if(
    conn: &Connection,
    key: &str,
    guards: &[Guard<'_>],
    mutation: Mutation<'_>,
) -> Result<bool> {
    let (assignment, mut values) = mutation.assignment();
    let mut sql = format!("UPDATE license_keys SET {} WHERE key = ?", assignment);
    values.push(Value::Text(key.to_string()));

    for guard in guards {
        let (condition, value) = guard.condition();
        sql.push_str(" AND ");
        sql.push_str(condition);
        values.extend(value);
    }

    let affected = conn
        .execute(&sql, rusqlite::params_from_iter(values))
        .map_err(hwid_conflict)?;
    Ok(affected > 0)
}

/// Unconditionally apply `mutation` and return the updated row.
pub fn update(conn: &Connection, key: &str, mutation: Mutation<'_>) -> Result<LicenseKey> {
    let (assignment, mut values) = mutation.assignment();
    values.push(Value::Text(key.to_string()));
    let sql = format!(
        "UPDATE license_keys SET {} WHERE key = ? RETURNING {}",
        assignment, LICENSE_KEY_COLS
    );

    conn.query_row(&sql, rusqlite::params_from_iter(values), LicenseKey::from_row)
        .optional()
        .map_err(hwid_conflict)?
        .ok_or_else(|| AppError::NotFound("License key not found".into()))
}

/// Hard delete a license key, releasing its hwid.
pub fn delete_license_key(conn: &Connection, key: &str) -> Result<()> {
    let affected = conn.execute("DELETE FROM license_keys WHERE key = ?1", params![key])?;
    if affected == 0 {
        return Err(AppError::NotFound("License key not found".into()));
    }
    Ok(())
}

/// Earliest and latest expiry among active, finite keys.
pub fn active_expiry_range(conn: &Connection) -> Result<Option<(i64, i64)>> {
    let range: (Option<i64>, Option<i64>) = conn.query_row(
        "SELECT MIN(expires_at), MAX(expires_at) FROM license_keys
         WHERE active = 1 AND expires_at IS NOT NULL",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(range.0.zip(range.1))
}

/// Shift the expiry of every active, finite key by `seconds`.
/// Callers check [`active_expiry_range`] first so the sums stay integers.
/// Returns the number of keys shifted.
pub fn shift_active_expiries(conn: &Connection, seconds: i64) -> Result<usize> {
    let affected = conn.execute(
        "UPDATE license_keys SET expires_at = expires_at + ?1
         WHERE active = 1 AND expires_at IS NOT NULL",
        params![seconds],
    )?;
    Ok(affected)
}
