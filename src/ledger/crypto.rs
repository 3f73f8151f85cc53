use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Errors that can occur during cryptographic operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Decoding error: {0}")]
    DecodeError(String),
}

/// A freshly generated secp256k1 keypair, both halves base58 encoded.
///
/// The public key doubles as the holder's ledger address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Keypair {
    /// Base58-encoded private scalar (32 bytes)
    pub private_key: String,

    /// Base58-encoded SEC1 uncompressed public key (65 bytes)
    pub public_key: String,
}

/// Generates a fresh secp256k1 keypair.
///
/// Both keys are returned base58 encoded so they can be carried as plain text.
/// This operation cannot fail.
pub fn generate_keypair() -> Keypair {
    let signing_key = SigningKey::random(&mut OsRng);
    let verifying_key = VerifyingKey::from(&signing_key);

    Keypair {
        private_key: bs58::encode(signing_key.to_bytes()).into_string(),
        public_key: bs58::encode(verifying_key.to_encoded_point(false).as_bytes()).into_string(),
    }
}

/// Signs a UTF-8 message with a base58-encoded private key.
///
/// Returns the base58-encoded signature. Fails with [`CryptoError::DecodeError`]
/// if the private key is not valid base58 or not a valid curve scalar.
pub fn sign(private_key_b58: &str, message: &str) -> Result<String, CryptoError> {
    let key_bytes = bs58::decode(private_key_b58)
        .into_vec()
        .map_err(|e| CryptoError::DecodeError(e.to_string()))?;

    let signing_key = SigningKey::from_slice(&key_bytes)
        .map_err(|e| CryptoError::DecodeError(e.to_string()))?;

    let signature: Signature = signing_key.sign(message.as_bytes());
    Ok(bs58::encode(signature.to_bytes()).into_string())
}

/// Verifies a base58-encoded signature over a UTF-8 message.
///
/// Returns true iff the signature was produced by the keypair whose public
/// half is `public_key_b58`. Malformed keys or signatures verify as false
/// rather than raising an error, so a bad signature is data, not a failure.
pub fn verify(public_key_b58: &str, message: &str, signature_b58: &str) -> bool {
    let key_bytes = match bs58::decode(public_key_b58).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let verifying_key = match VerifyingKey::from_sec1_bytes(&key_bytes) {
        Ok(key) => key,
        Err(_) => return false,
    };

    let sig_bytes = match bs58::decode(signature_b58).into_vec() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let signature = match Signature::from_slice(&sig_bytes) {
        Ok(sig) => sig,
        Err(_) => return false,
    };

    verifying_key.verify(message.as_bytes(), &signature).is_ok()
}
