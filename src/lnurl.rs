// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LNURL protocol primitives: bech32 encoding of callback URLs and
//! verification of LNURL-auth linking-key signatures.

use bech32::{Bech32, Hrp};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};

#[derive(Debug, thiserror::Error)]
pub enum LnurlEncodeError {
    #[error("invalid human-readable part: {0}")]
    Hrp(#[from] bech32::primitives::hrp::Error),

    #[error("bech32 encoding failed: {0}")]
    Encode(#[from] bech32::EncodeError),
}

/// Encode a URL as a bech32 `lnurl1...` string.
///
/// LNURL ignores the 90-character bech32 length limit; the encoder does not
/// enforce it either.
pub fn encode(url: &str) -> Result<String, LnurlEncodeError> {
    let hrp = Hrp::parse("lnurl")?;
    Ok(bech32::encode::<Bech32>(hrp, url.as_bytes())?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthSignatureError {
    #[error("k1 must be 32 hex-encoded bytes")]
    MalformedK1,

    #[error("key must be a hex-encoded SEC1 secp256k1 public key")]
    MalformedKey,

    #[error("sig must be a hex-encoded DER signature")]
    MalformedSignature,

    #[error("signature does not match k1 and key")]
    InvalidSignature,
}

/// Verify an LNURL-auth signature: ECDSA over secp256k1, where the 32-byte
/// k1 challenge is signed directly as the message digest.
pub fn verify_auth_signature(
    k1_hex: &str,
    sig_der_hex: &str,
    key_hex: &str,
) -> Result<(), AuthSignatureError> {
    let k1 = hex::decode(k1_hex).map_err(|_| AuthSignatureError::MalformedK1)?;
    if k1.len() != 32 {
        return Err(AuthSignatureError::MalformedK1);
    }

    let key_bytes = hex::decode(key_hex).map_err(|_| AuthSignatureError::MalformedKey)?;
    let key = VerifyingKey::from_sec1_bytes(&key_bytes)
        .map_err(|_| AuthSignatureError::MalformedKey)?;

    let sig_bytes = hex::decode(sig_der_hex).map_err(|_| AuthSignatureError::MalformedSignature)?;
    let sig =
        Signature::from_der(&sig_bytes).map_err(|_| AuthSignatureError::MalformedSignature)?;

    key.verify_prehash(&k1, &sig)
        .map_err(|_| AuthSignatureError::InvalidSignature)
}
