//! Credential bundle decoding.
//!
//! Accounts store their platform credential as an opaque base64 string
//! wrapping a JSON payload: `{token, ua, cookies: [{name, value}]}`.
//! Decoding validates the shape; anything malformed is a typed
//! `InvalidCredential`, never an untyped value.

use base64::Engine;

use guardpost_core::error::{GuardPostError, Result};
use guardpost_core::types::CredentialBundle;

/// Decode an opaque credential bundle into its validated form.
pub fn decode_bundle(encoded: &str) -> Result<CredentialBundle> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| GuardPostError::InvalidCredential(format!("bad base64: {e}")))?;
    let bundle: CredentialBundle = serde_json::from_slice(&raw)
        .map_err(|e| GuardPostError::InvalidCredential(format!("bad payload: {e}")))?;
    if bundle.bearer_token.is_empty() {
        return Err(GuardPostError::InvalidCredential("empty bearer token".into()));
    }
    Ok(bundle)
}
