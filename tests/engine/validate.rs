//! Tests for the validate state machine: lookup, disabled, expired, binding rules.

#[path = "../common/mod.rs"]
mod common;

use common::*;

fn accepted(acceptance: Acceptance) -> Decision {
    Decision::Accepted(acceptance)
}

fn rejected(reason: RejectReason) -> Decision {
    Decision::Rejected(reason)
}

#[test]
fn test_unknown_key_is_invalid() {
    let conn = setup_test_db();
    let decision = engine::validate(&conn, "no-such-key", "dev-1", None, NOW).unwrap();
    assert_eq!(decision, rejected(RejectReason::InvalidKey));
}

#[test]
fn test_blank_key_is_invalid() {
    let conn = setup_test_db();
    let decision = engine::validate(&conn, "   ", "dev-1", None, NOW).unwrap();
    assert_eq!(decision, rejected(RejectReason::InvalidKey));
}

#[test]
fn test_blank_hwid_is_bad_request() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, None);

    let result = engine::validate(&conn, &license.key, "  ", None, NOW);

    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert!(fetch(&conn, &license.key).hwid.is_none());
}

#[test]
fn test_first_validation_binds_hwid() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, Some(NOW + ONE_DAY));

    let decision = engine::validate(&conn, &license.key, "dev-1", None, NOW).unwrap();

    assert_eq!(decision, accepted(Acceptance::BoundNow));
    assert_eq!(fetch(&conn, &license.key).hwid.as_deref(), Some("dev-1"));
}

#[test]
fn test_inputs_are_trimmed() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, None);

    let padded_key = format!("  {}\n", license.key);
    let decision = engine::validate(&conn, &padded_key, " dev-1 ", Some(" Alice "), NOW).unwrap();

    assert_eq!(decision, accepted(Acceptance::BoundNow));
    let stored = fetch(&conn, &license.key);
    assert_eq!(stored.hwid.as_deref(), Some("dev-1"));
    assert_eq!(stored.name.as_deref(), Some("Alice"));
}

#[test]
fn test_repeat_validation_is_idempotent() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, None);

    let first = engine::validate(&conn, &license.key, "dev-1", None, NOW).unwrap();
    let second = engine::validate(&conn, &license.key, "dev-1", None, NOW).unwrap();

    assert_eq!(first, accepted(Acceptance::BoundNow));
    assert_eq!(second, accepted(Acceptance::AlreadyBound));
    assert_eq!(fetch(&conn, &license.key).hwid.as_deref(), Some("dev-1"));
}

#[test]
fn test_other_device_is_mismatch() {
    let conn = setup_test_db();
    let license = create_bound_key(&conn, "dev-1", None);

    let decision = engine::validate(&conn, &license.key, "dev-2", None, NOW).unwrap();

    assert_eq!(decision, rejected(RejectReason::HwidMismatch));
    assert_eq!(fetch(&conn, &license.key).hwid.as_deref(), Some("dev-1"));
}

#[test]
fn test_device_bound_elsewhere_is_conflict() {
    let conn = setup_test_db();
    let _owner = create_bound_key(&conn, "dev-1", None);
    let fresh = create_test_key(&conn, None);

    let decision = engine::validate(&conn, &fresh.key, "dev-1", None, NOW).unwrap();

    assert_eq!(decision, rejected(RejectReason::HwidConflict));
    assert!(
        fetch(&conn, &fresh.key).hwid.is_none(),
        "a conflicting validation must not bind"
    );
}

#[test]
fn test_disabled_checked_before_expiry_and_binding() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, Some(NOW - ONE_DAY));
    engine::disable(&conn, &license.key).unwrap();

    let decision = engine::validate(&conn, &license.key, "dev-1", None, NOW).unwrap();

    assert_eq!(decision, rejected(RejectReason::Disabled));
    assert!(fetch(&conn, &license.key).hwid.is_none());
}

#[test]
fn test_expired_checked_before_binding() {
    let conn = setup_test_db();
    let _owner = create_bound_key(&conn, "dev-1", None);
    let expired = create_test_key(&conn, Some(NOW - 1));

    let decision = engine::validate(&conn, &expired.key, "dev-1", None, NOW).unwrap();

    assert_eq!(decision, rejected(RejectReason::Expired));
}

#[test]
fn test_expiry_boundary() {
    let conn = setup_test_db();
    let at_now = create_test_key(&conn, Some(NOW));
    let one_second_left = create_test_key(&conn, Some(NOW + 1));

    assert_eq!(
        engine::validate(&conn, &at_now.key, "dev-a", None, NOW).unwrap(),
        rejected(RejectReason::Expired),
        "expires_at == now must be expired"
    );
    assert_eq!(
        engine::validate(&conn, &one_second_left.key, "dev-b", None, NOW).unwrap(),
        accepted(Acceptance::BoundNow),
        "expires_at one second ahead must still validate"
    );
}

#[test]
fn test_infinite_key_never_expires() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, None);

    let decision = engine::validate(&conn, &license.key, "dev-1", None, i64::MAX / 2).unwrap();
    assert_eq!(decision, accepted(Acceptance::BoundNow));
}

#[test]
fn test_name_set_on_bind() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, None);

    engine::validate(&conn, &license.key, "dev-1", Some("Alice"), NOW).unwrap();

    assert_eq!(fetch(&conn, &license.key).name.as_deref(), Some("Alice"));
}

#[test]
fn test_name_filled_on_later_validation_when_absent() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, None);

    engine::validate(&conn, &license.key, "dev-1", None, NOW).unwrap();
    let decision = engine::validate(&conn, &license.key, "dev-1", Some("Alice"), NOW).unwrap();

    assert_eq!(decision, accepted(Acceptance::AlreadyBound));
    assert_eq!(fetch(&conn, &license.key).name.as_deref(), Some("Alice"));
}

#[test]
fn test_name_not_overwritten_by_validation() {
    let conn = setup_test_db();
    let license = create_test_key(&conn, None);

    engine::validate(&conn, &license.key, "dev-1", Some("Alice"), NOW).unwrap();
    engine::validate(&conn, &license.key, "dev-1", Some("Mallory"), NOW).unwrap();

    assert_eq!(fetch(&conn, &license.key).name.as_deref(), Some("Alice"));
}

#[test]
fn test_mismatched_device_cannot_set_name() {
    let conn = setup_test_db();
    let license = create_bound_key(&conn, "dev-1", None);

    engine::validate(&conn, &license.key, "dev-2", Some("Mallory"), NOW).unwrap();

    assert!(fetch(&conn, &license.key).name.is_none());
}

#[test]
fn test_end_to_end_bind_mismatch_rebind_auto_login() {
    let mut conn = setup_test_db();

    let keys = engine::generate(&mut conn, 1, DurationPolicy::Days(1), MAX_GENERATE, NOW).unwrap();
    let key = &keys[0];

    assert_eq!(
        engine::validate(&conn, key, "devA", None, NOW).unwrap(),
        accepted(Acceptance::BoundNow)
    );
    assert_eq!(
        engine::validate(&conn, key, "devB", None, NOW).unwrap(),
        rejected(RejectReason::HwidMismatch)
    );
    assert_eq!(
        engine::validate(&conn, key, "devA", None, NOW).unwrap(),
        accepted(Acceptance::AlreadyBound)
    );
    assert_eq!(
        engine::auto_login(&conn, "devA", NOW).unwrap(),
        accepted(Acceptance::Login { key: key.clone() })
    );
}
