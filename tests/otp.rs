//! One-Time Password Tests
//!
//! Covers code generation, hashing, the store, and the issue/verify lifecycle.

mod common;

use common::{extract_code, Gateway, Outcome, TEST_EMAIL, TEST_PHONE};
use herald::app::otp::{Argon2OtpGenerator, OtpGenerator, OtpStore};
use herald::domain::destination::{NotificationDestination, ServiceKey};
use herald::domain::otp::OTP_TIME_TO_LIVE;
use herald::infra::memory_store::InMemoryOtpStore;
use herald::infra::sms::sms_body;
use time::OffsetDateTime;

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

// ===========================================================================
// Generator
// ===========================================================================

#[test]
fn generated_code_is_six_digits() {
    let generator = Argon2OtpGenerator;
    for _ in 0..5 {
        let packet = generator.generate().unwrap();
        assert_eq!(packet.code.len(), 6);
        assert!(packet.code.chars().all(|c| c.is_ascii_digit()), "{}", packet.code);
    }
}

#[test]
fn hash_is_argon2id_and_never_the_code() {
    let packet = Argon2OtpGenerator.generate().unwrap();
    assert!(packet.hash.starts_with("$argon2id$"));
    assert!(!packet.hash.contains(&packet.code));
}

#[test]
fn packet_expires_in_fifteen_minutes() {
    let before = OffsetDateTime::now_utc() + OTP_TIME_TO_LIVE;
    let packet = Argon2OtpGenerator.generate().unwrap();
    let after = OffsetDateTime::now_utc() + OTP_TIME_TO_LIVE;

    let before_ms = (before.unix_timestamp_nanos() / 1_000_000) as i64;
    let after_ms = (after.unix_timestamp_nanos() / 1_000_000) as i64;
    assert!(packet.exp >= before_ms && packet.exp <= after_ms);
    assert_eq!(packet.expires_at_seconds(), packet.exp / 1000);
}

#[test]
fn verify_matches_only_the_issued_code() {
    let generator = Argon2OtpGenerator;
    let packet = generator.generate().unwrap();

    assert!(generator.verify(&packet.code, &packet.hash));

    let other = if packet.code == "000000" { "000001" } else { "000000" };
    assert!(!generator.verify(other, &packet.hash));
}

#[test]
fn verify_against_garbage_hash_is_false() {
    let generator = Argon2OtpGenerator;
    assert!(!generator.verify("123456", "garbage-not-a-real-hash"));
    assert!(!generator.verify("123456", ""));
}

#[test]
fn packet_debug_hides_the_code() {
    let packet = Argon2OtpGenerator.generate().unwrap();
    let rendered = format!("{:?}", packet);
    assert!(!rendered.contains(&format!("\"{}\"", packet.code)));
    assert!(rendered.contains("******"));
}

// ===========================================================================
// In-memory store
// ===========================================================================

#[tokio::test]
async fn store_returns_live_hash() {
    let store = InMemoryOtpStore::new();
    store.save(TEST_EMAIL, "hash-1", now() + 60).await.unwrap();

    assert_eq!(store.fetch(TEST_EMAIL).await.unwrap().as_deref(), Some("hash-1"));
}

#[tokio::test]
async fn store_hides_expired_record() {
    let store = InMemoryOtpStore::new();
    store.save(TEST_PHONE, "hash-1", now() - 1).await.unwrap();

    assert_eq!(store.fetch(TEST_PHONE).await.unwrap(), None);
    assert!(store.record(TEST_PHONE).await.is_none(), "expired record dropped");
}

#[tokio::test]
async fn store_save_replaces_previous_record() {
    let store = InMemoryOtpStore::new();
    store.save(TEST_EMAIL, "hash-1", now() + 60).await.unwrap();
    store.save(TEST_EMAIL, "hash-2", now() + 60).await.unwrap();

    assert_eq!(store.fetch(TEST_EMAIL).await.unwrap().as_deref(), Some("hash-2"));
}

#[tokio::test]
async fn store_remove_is_idempotent() {
    let store = InMemoryOtpStore::new();
    store.remove_all_for(TEST_EMAIL).await.unwrap();

    store.save(TEST_EMAIL, "hash-1", now() + 60).await.unwrap();
    store.remove_all_for(TEST_EMAIL).await.unwrap();
    store.remove_all_for(TEST_EMAIL).await.unwrap();

    assert_eq!(store.fetch(TEST_EMAIL).await.unwrap(), None);
}

#[tokio::test]
async fn store_keys_identifiers_exactly() {
    let store = InMemoryOtpStore::new();
    store.save("Patient@Example.com", "hash-1", now() + 60).await.unwrap();

    assert_eq!(store.fetch("patient@example.com").await.unwrap(), None);
}

// ===========================================================================
// Manager lifecycle
// ===========================================================================

#[tokio::test]
async fn email_code_is_stored_sent_and_verified() {
    let gateway = Gateway::new();

    let result = gateway
        .otp
        .send_one_time_password_via_email(TEST_EMAIL)
        .await
        .unwrap();
    assert!(result.successful);

    let record = gateway.store.record(TEST_EMAIL).await.expect("record stored");
    assert!(record.hash.starts_with("$argon2"));
    assert!(record.expires_at > now());
    assert!(record.expires_at <= now() + OTP_TIME_TO_LIVE.whole_seconds());

    assert_eq!(gateway.email.count(), 1);
    assert_eq!(gateway.total_sent(), 1);
    let sent = gateway.email.last().unwrap();
    assert_eq!(
        sent.destination,
        NotificationDestination::Email {
            email: TEST_EMAIL.to_string()
        }
    );

    let code = extract_code(sent.message.body());
    assert_eq!(code.len(), 6);
    assert!(sent.message.body().contains(&code));
    let ses = sent.message.opts().ses.as_ref().unwrap();
    assert_eq!(ses.template_data["code"], code.as_str());
    assert!(!record.hash.contains(&code));

    assert!(gateway
        .otp
        .validate_one_time_password(TEST_EMAIL, &code)
        .await
        .unwrap());
}

#[tokio::test]
async fn sms_code_arrives_as_bare_body() {
    let gateway = Gateway::new();

    gateway
        .otp
        .send_one_time_password_via_sms(TEST_PHONE)
        .await
        .unwrap();

    let sent = gateway.sms.last().unwrap();
    assert_eq!(sent.destination.service(), ServiceKey::Sms);
    assert_eq!(sms_body(&sent.message), sent.message.body());

    let code = extract_code(sent.message.body());
    assert!(gateway
        .otp
        .validate_one_time_password(TEST_PHONE, &code)
        .await
        .unwrap());
}

#[tokio::test]
async fn successful_verify_is_single_use() {
    let gateway = Gateway::new();
    gateway
        .otp
        .send_one_time_password_via_email(TEST_EMAIL)
        .await
        .unwrap();
    let code = extract_code(gateway.email.last().unwrap().message.body());

    assert!(gateway.otp.validate_one_time_password(TEST_EMAIL, &code).await.unwrap());
    assert!(!gateway.otp.validate_one_time_password(TEST_EMAIL, &code).await.unwrap());
    assert!(gateway.store.record(TEST_EMAIL).await.is_none());
}

#[tokio::test]
async fn wrong_code_keeps_the_record() {
    let gateway = Gateway::new();
    gateway
        .otp
        .send_one_time_password_via_email(TEST_EMAIL)
        .await
        .unwrap();
    let code = extract_code(gateway.email.last().unwrap().message.body());
    let wrong = if code == "999999" { "999998" } else { "999999" };

    assert!(!gateway.otp.validate_one_time_password(TEST_EMAIL, wrong).await.unwrap());
    assert!(gateway.otp.validate_one_time_password(TEST_EMAIL, &code).await.unwrap());
}

#[tokio::test]
async fn second_send_invalidates_first_code() {
    let gateway = Gateway::new();

    gateway
        .otp
        .send_one_time_password_via_sms(TEST_PHONE)
        .await
        .unwrap();
    let first = extract_code(gateway.sms.last().unwrap().message.body());

    gateway
        .otp
        .send_one_time_password_via_sms(TEST_PHONE)
        .await
        .unwrap();
    let second = extract_code(gateway.sms.last().unwrap().message.body());

    if first != second {
        assert!(!gateway.otp.validate_one_time_password(TEST_PHONE, &first).await.unwrap());
    }
    assert!(gateway.otp.validate_one_time_password(TEST_PHONE, &second).await.unwrap());
}

#[tokio::test]
async fn never_issued_identifier_fails_without_hashing() {
    let gateway = Gateway::new();

    let is_valid = gateway
        .otp
        .validate_one_time_password("+15555550999", "123456")
        .await
        .unwrap();

    assert!(!is_valid);
    assert_eq!(gateway.generator.verify_calls(), 0);
}

#[tokio::test]
async fn expired_code_fails() {
    let gateway = Gateway::new();
    let packet = Argon2OtpGenerator.generate().unwrap();
    gateway
        .store
        .save(TEST_EMAIL, &packet.hash, now() - 5)
        .await
        .unwrap();

    assert!(!gateway
        .otp
        .validate_one_time_password(TEST_EMAIL, &packet.code)
        .await
        .unwrap());
    assert_eq!(gateway.generator.verify_calls(), 0);
}

#[tokio::test]
async fn codes_are_scoped_to_their_identifier() {
    let gateway = Gateway::new();
    gateway
        .otp
        .send_one_time_password_via_email(TEST_EMAIL)
        .await
        .unwrap();
    let code = extract_code(gateway.email.last().unwrap().message.body());

    assert!(!gateway
        .otp
        .validate_one_time_password("other@example.com", &code)
        .await
        .unwrap());
    assert!(gateway.store.record(TEST_EMAIL).await.is_some());
}

#[tokio::test]
async fn vendor_failure_surfaces_from_send() {
    let gateway = Gateway::with_outcome(ServiceKey::Email, Outcome::Fail);

    let err = gateway
        .otp
        .send_one_time_password_via_email(TEST_EMAIL)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("vendor unavailable"));
    assert_eq!(gateway.generator.generate_calls(), 1);
}

#[tokio::test]
async fn recipient_rejection_still_reports_result() {
    let gateway = Gateway::with_outcome(ServiceKey::Sms, Outcome::Reject("opted out"));

    let result = gateway
        .otp
        .send_one_time_password_via_sms(TEST_PHONE)
        .await
        .unwrap();

    assert!(!result.successful);
    assert_eq!(result.failure_reason.as_deref(), Some("opted out"));
}
