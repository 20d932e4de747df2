//! Stripe webhook signature verification.
//!
//! HMAC-SHA256 over `"<timestamp>." ++ raw body`, checked in constant time.
//! The body must be the exact bytes received; any re-serialisation breaks
//! the signature. Verification touches no state.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::webhook_errors::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Default replay window for signed timestamps (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future timestamps (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Parsed components from the Stripe-Signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// v1 signatures (HMAC-SHA256). More than one is sent during secret rotation.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses a Stripe-Signature header string.
    ///
    /// Format: `t=<timestamp>,v1=<signature>[,v1=<signature>...]`
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::InvalidSignature` if the header format is invalid.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures: Vec<Vec<u8>> = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| WebhookError::InvalidSignature("invalid header format".into()))?;

            match key.trim() {
                "t" => {
                    timestamp = Some(value.trim().parse().map_err(|_| {
                        WebhookError::InvalidSignature("invalid timestamp".into())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value.trim()).map_err(|_| {
                        WebhookError::InvalidSignature("invalid v1 signature hex".into())
                    })?);
                }
                _ => {
                    // v0 and future schemes are ignored
                }
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| WebhookError::InvalidSignature("missing timestamp".into()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::InvalidSignature("missing v1 signature".into()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for Stripe webhook signatures.
pub struct WebhookVerifier {
    /// The webhook signing secret from the Stripe dashboard.
    secret: SecretString,
    /// Maximum accepted age of a signed timestamp, in seconds.
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// Creates a new verifier with the given webhook secret and the default window.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Overrides the replay window.
    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies the signature of `payload` against the current clock.
    pub fn verify(&self, payload: &[u8], signature_header: Option<&str>) -> Result<(), WebhookError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verifies the signature of `payload` as of `now` (unix seconds).
    ///
    /// # Verification Steps
    ///
    /// 1. Require and parse the signature header
    /// 2. Validate timestamp is within the replay window
    /// 3. Compute expected signature using HMAC-SHA256
    /// 4. Compare against every v1 signature in constant time
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
        now: i64,
    ) -> Result<(), WebhookError> {
        let raw = signature_header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(WebhookError::MissingSignature)?;
        let header = SignatureHeader::parse(raw)?;

        self.validate_timestamp(header.timestamp, now)?;

        let expected = self.compute_signature(header.timestamp, payload)?;

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature("signature mismatch".into()));
        }

        Ok(())
    }

    /// Validates that the timestamp is within acceptable bounds.
    ///
    /// `timestamp` is unauthenticated input; an age that does not fit in
    /// an `i64` is simply out of range.
    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now
            .checked_sub(timestamp)
            .ok_or(WebhookError::TimestampOutOfRange)?;

        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::TimestampOutOfRange);
        }

        Ok(())
    }

    /// Computes the HMAC-SHA256 signature for the given timestamp and raw payload.
    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::NotConfigured("webhook secret"))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Computes a hex HMAC-SHA256 signature for use in test fixtures.
#[cfg(test)]
pub fn compute_test_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_704_067_200;

    fn signed_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            compute_test_signature(secret, timestamp, payload)
        )
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_single_v1() {
        let header = SignatureHeader::parse(&format!("t=1234567890,v1={}", "a".repeat(64))).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signatures.len(), 1);
        assert_eq!(header.v1_signatures[0].len(), 32);
    }

    #[test]
    fn parse_header_collects_every_v1() {
        let header_str = format!("t=1,v1={},v1={}", "a".repeat(64), "b".repeat(64));
        let header = SignatureHeader::parse(&header_str).unwrap();
        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn parse_header_ignores_v0_and_unknown_fields() {
        let header_str = format!("t=1,v1={},v0={},scheme=hmac", "a".repeat(64), "b".repeat(64));
        let header = SignatureHeader::parse(&header_str).unwrap();
        assert_eq!(header.v1_signatures.len(), 1);
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn parse_header_missing_v1_fails() {
        let result = SignatureHeader::parse("t=1234567890");
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn parse_header_invalid_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("t=soon,v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        let result = SignatureHeader::parse("t=1234567890,v1=not_valid_hex");
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn parse_header_without_equals_fails() {
        let result = SignatureHeader::parse("t1234567890");
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload = br#"{"id":"evt_1","type":"customer.subscription.updated"}"#;
        let header = signed_header(TEST_SECRET, NOW, payload);

        assert!(verifier.verify_at(payload, Some(&header), NOW).is_ok());
    }

    #[test]
    fn verify_uses_raw_bytes_not_utf8() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload: &[u8] = &[0x7b, 0xff, 0xfe, 0x7d];
        let header = signed_header(TEST_SECRET, NOW, payload);

        assert!(verifier.verify_at(payload, Some(&header), NOW).is_ok());
    }

    #[test]
    fn verify_missing_header_fails() {
        let verifier = WebhookVerifier::new(TEST_SECRET);

        let result = verifier.verify_at(b"{}", None, NOW);
        assert!(matches!(result, Err(WebhookError::MissingSignature)));

        let result = verifier.verify_at(b"{}", Some("  "), NOW);
        assert!(matches!(result, Err(WebhookError::MissingSignature)));
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let verifier = WebhookVerifier::new("whsec_other");
        let payload = br#"{"id":"evt_1"}"#;
        let header = signed_header(TEST_SECRET, NOW, payload);

        let result = verifier.verify_at(payload, Some(&header), NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn verify_tampered_payload_fails() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let header = signed_header(TEST_SECRET, NOW, br#"{"status":"canceled"}"#);

        let result = verifier.verify_at(br#"{"status":"active"}"#, Some(&header), NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn verify_reserialized_payload_fails() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let original = b"{\n  \"id\": \"evt_1\"\n}";
        let header = signed_header(TEST_SECRET, NOW, original);

        let value: serde_json::Value = serde_json::from_slice(original).unwrap();
        let reserialized = serde_json::to_vec(&value).unwrap();

        let result = verifier.verify_at(&reserialized, Some(&header), NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature(_))));
    }

    #[test]
    fn verify_accepts_any_matching_v1() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload = br#"{"id":"evt_rotation"}"#;
        let header = format!(
            "t={},v1={},v1={}",
            NOW,
            compute_test_signature("whsec_old_secret", NOW, payload),
            compute_test_signature(TEST_SECRET, NOW, payload)
        );

        assert!(verifier.verify_at(payload, Some(&header), NOW).is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn timestamp_at_boundary_succeeds() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload = b"{}";
        let header = signed_header(TEST_SECRET, NOW - 300, payload);

        assert!(verifier.verify_at(payload, Some(&header), NOW).is_ok());
    }

    #[test]
    fn timestamp_just_past_boundary_fails() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload = b"{}";
        let header = signed_header(TEST_SECRET, NOW - 301, payload);

        let result = verifier.verify_at(payload, Some(&header), NOW);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn custom_tolerance_is_honoured() {
        let verifier = WebhookVerifier::new(TEST_SECRET).with_tolerance_secs(60);
        let payload = b"{}";
        let header = signed_header(TEST_SECRET, NOW - 120, payload);

        let result = verifier.verify_at(payload, Some(&header), NOW);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn timestamp_from_future_within_skew_succeeds() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload = b"{}";
        let header = signed_header(TEST_SECRET, NOW + 30, payload);

        assert!(verifier.verify_at(payload, Some(&header), NOW).is_ok());
    }

    #[test]
    fn timestamp_from_future_beyond_skew_fails() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload = b"{}";
        let header = signed_header(TEST_SECRET, NOW + 120, payload);

        let result = verifier.verify_at(payload, Some(&header), NOW);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn extreme_timestamps_are_out_of_range() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let sig = "a".repeat(64);

        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1={}", t, sig);
            let result = verifier.verify_at(b"{}", Some(&header), NOW);
            assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
        }

        let header = format!("t=-1,v1={}", sig);
        let result = verifier.verify_at(b"{}", Some(&header), i64::MAX);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn verify_against_wall_clock() {
        let verifier = WebhookVerifier::new(TEST_SECRET);
        let payload = b"{}";
        let header = signed_header(TEST_SECRET, chrono::Utc::now().timestamp(), payload);

        assert!(verifier.verify(payload, Some(&header)).is_ok());
    }

    // ══════════════════════════════════════════════════════════════
    // Constant Time Comparison Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn constant_time_compare_equal_values() {
        assert!(constant_time_compare(&[1, 2, 3], &[1, 2, 3]));
    }

    #[test]
    fn constant_time_compare_different_values() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 4]));
    }

    #[test]
    fn constant_time_compare_different_lengths() {
        assert!(!constant_time_compare(&[1, 2, 3], &[1, 2, 3, 4]));
    }

    proptest! {
        #[test]
        fn tampered_payload_never_verifies(
            body in proptest::collection::vec(any::<u8>(), 1..256),
            flip_at in any::<proptest::sample::Index>(),
        ) {
            let verifier = WebhookVerifier::new(TEST_SECRET);
            let header = signed_header(TEST_SECRET, NOW, &body);

            let mut tampered = body.clone();
            let idx = flip_at.index(tampered.len());
            tampered[idx] ^= 0x01;

            prop_assert!(verifier.verify_at(&body, Some(&header), NOW).is_ok());
            prop_assert!(verifier.verify_at(&tampered, Some(&header), NOW).is_err());
        }

        #[test]
        fn any_header_timestamp_is_rejected_without_panicking(t in any::<i64>(), now in any::<i64>()) {
            let verifier = WebhookVerifier::new(TEST_SECRET);
            let header = format!("t={},v1={}", t, "a".repeat(64));

            let body: &[u8] = b"{}";
            prop_assert!(verifier.verify_at(body, Some(&header), now).is_err());
        }
    }
}
