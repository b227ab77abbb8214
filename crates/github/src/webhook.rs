use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRef, FromRequest, Request},
    http::HeaderMap,
};
use hmac::{Hmac, Mac};
use preview_sync_core::{SyncError, config::Config};
use sha2::Sha256;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const EVENT_HEADER: &str = "X-GitHub-Event";
const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("X-Hub-Signature-256 required")]
    Missing,
    #[error("X-Hub-Signature-256 sha256= prefix missing")]
    Prefix,
    #[error("X-Hub-Signature-256 malformed")]
    Malformed,
    #[error("Invalid signature")]
    Mismatch,
}

impl From<SignatureError> for SyncError {
    fn from(err: SignatureError) -> Self { SyncError::Authentication(err.to_string()) }
}

/// Decode a `sha256=<hex>` header value into the raw digest.
///
/// Only lowercase hex is accepted, matching the digest GitHub sends.
fn parse_signature(header: Option<&str>) -> Result<Vec<u8>, SignatureError> {
    let digest = header
        .ok_or(SignatureError::Missing)?
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(SignatureError::Prefix)?;
    if !digest.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(SignatureError::Malformed);
    }
    hex::decode(digest).map_err(|_| SignatureError::Malformed)
}

fn verify_digest(secret: &[u8], body: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    // verify_slice compares in constant time
    mac.verify_slice(signature).map_err(|_| SignatureError::Mismatch)
}

/// Check `header` against the HMAC-SHA256 of `body` keyed with `secret`.
pub fn verify_signature(
    secret: &[u8],
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let signature = parse_signature(header)?;
    verify_digest(secret, body, &signature)
}

/// Produce the `X-Hub-Signature-256` value GitHub would send for `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Verified raw webhook delivery.
///
/// The body is only handed out after its signature has been checked, so
/// nothing downstream can observe unauthenticated content.
#[derive(Clone, Debug)]
#[must_use]
pub struct SignedDelivery {
    /// Value of the `X-GitHub-Event` header, if sent.
    pub event: Option<String>,
    pub body: Bytes,
}

impl<S> FromRequest<S> for SignedDelivery
where
    Arc<Config>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SyncError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let event = header_str(req.headers(), EVENT_HEADER).map(str::to_owned);
        // Reject unsigned requests before reading the body
        let signature = parse_signature(header_str(req.headers(), SIGNATURE_HEADER))?;
        let config = <Arc<Config>>::from_ref(state);
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| SyncError::Validation(format!("Error reading body: {e}")))?;
        verify_digest(config.github.webhook_secret.as_bytes(), &body, &signature)?;
        Ok(SignedDelivery { event, body })
    }
}
