//! Device fingerprint derivation.
//!
//! Derives a best-effort stable identifier from request-observable
//! attributes. A client-provided device id dominates when present (strong
//! identity); otherwise the fingerprint falls back to the user agent plus a
//! coarse network identifier -- a weak identity that a motivated client can
//! spoof. The resulting hash is only ever used for anomaly signaling, never
//! as an authentication factor.

use crate::hashing::sha256_hex;

/// Distinct users linked to one device within the window before it is
/// flagged as suspicious.
pub const SUSPICIOUS_USER_THRESHOLD: i64 = 5;

/// Sliding window for the suspicion heuristic, in hours.
pub const SUSPICIOUS_WINDOW_HOURS: i64 = 24;

/// Request-observable attributes a fingerprint is derived from.
#[derive(Debug, Clone, Default)]
pub struct DeviceAttributes {
    /// `User-Agent` header, if present.
    pub user_agent: Option<String>,
    /// Coarse network identifier (e.g. the first `X-Forwarded-For` hop).
    pub coarse_network_id: Option<String>,
    /// Client-provided device id (`X-Device-Id`). Dominates when present.
    pub client_device_id: Option<String>,
}

/// Derive the device hash from a canonical concatenation of the available
/// attributes.
pub fn fingerprint(attrs: &DeviceAttributes) -> String {
    let material = match &attrs.client_device_id {
        Some(device_id) => format!("device:{device_id}"),
        None => format!(
            "ua:{}|net:{}",
            attrs.user_agent.as_deref().unwrap_or(""),
            attrs.coarse_network_id.as_deref().unwrap_or(""),
        ),
    };
    sha256_hex(material.as_bytes())
}

/// Whether a linked-user count observed within the sliding window crosses
/// the suspicion threshold.
///
/// Advisory only: callers surface this as a signal (e.g. for step-up
/// verification) and must never use it as the sole gate on an operation.
pub fn is_suspicious(distinct_users_in_window: i64) -> bool {
    distinct_users_in_window > SUSPICIOUS_USER_THRESHOLD
}
