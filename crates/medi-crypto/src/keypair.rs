use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use pem::Pem;
use thiserror::Error;
use zeroize::Zeroize;

use medi_core::MediatorId;

use crate::hash::mediator_id_from_pubkey;

const PEM_LABEL: &str = "MEDIATOR PRIVATE KEY";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid PEM: {0}")]
    InvalidPem(String),
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("signature verification failed")]
    BadSignature,
}

/// A mediator keypair: Ed25519 public + secret key, PEM-encoded on disk
/// (spec.md §2: "Asymmetric signing (PEM)"), with a derived `MediatorId`.
///
/// The secret key is zeroized on drop, mirroring
/// `chronx-crypto::keypair::KeyPair`.
pub struct MediatorKeyPair {
    pub mediator_id: MediatorId,
    pub public_key: VerifyingKey,
    signing_key: SigningKey,
}

impl MediatorKeyPair {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let public_key = signing_key.verifying_key();
        let mediator_id = mediator_id_from_pubkey(public_key.as_bytes());
        Self { mediator_id, public_key, signing_key }
    }

    /// Load a keypair from a PEM-encoded 32-byte Ed25519 seed.
    pub fn from_pem(pem_str: &str) -> Result<Self, CryptoError> {
        let parsed = pem::parse(pem_str).map_err(|e| CryptoError::InvalidPem(e.to_string()))?;
        let bytes = parsed.contents();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))?;
        Ok(Self::from_signing_key(SigningKey::from_bytes(&arr)))
    }

    /// Encode this keypair's secret seed as PEM.
    pub fn to_pem(&self) -> String {
        let pem = Pem::new(PEM_LABEL, self.signing_key.to_bytes().to_vec());
        pem::encode(&pem)
    }

    /// Load a keypair from a PEM file on disk, generating and persisting a
    /// fresh one if the file does not exist yet.
    pub fn load_or_generate(path: &std::path::Path) -> Result<Self, CryptoError> {
        if let Ok(contents) = std::fs::read_to_string(path) {
            return Self::from_pem(&contents);
        }
        let kp = Self::generate();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(path, kp.to_pem());
        Ok(kp)
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.sign(message).to_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.as_bytes())
    }
}

impl Drop for MediatorKeyPair {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}

impl std::fmt::Debug for MediatorKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MediatorKeyPair {{ mediator_id: {:?} }}", self.mediator_id)
    }
}

/// Verify a signature given a hex-encoded public key.
pub fn verify_signature(pubkey_hex: &str, message: &[u8], signature_hex: &str) -> Result<(), CryptoError> {
    let pk_bytes = hex::decode(pubkey_hex).map_err(|_| CryptoError::BadSignature)?;
    let pk_arr: [u8; 32] = pk_bytes.try_into().map_err(|_| CryptoError::BadSignature)?;
    let verifying_key = VerifyingKey::from_bytes(&pk_arr).map_err(|_| CryptoError::BadSignature)?;

    let sig_bytes = hex::decode(signature_hex).map_err(|_| CryptoError::BadSignature)?;
    let sig_arr: [u8; 64] = sig_bytes.try_into().map_err(|_| CryptoError::BadSignature)?;
    let signature = Signature::from_bytes(&sig_arr);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = MediatorKeyPair::generate();
        let msg = b"hello settlement";
        let sig = kp.sign_hex(msg);
        verify_signature(&kp.public_key_hex(), msg, &sig).expect("signature should verify");
    }

    #[test]
    fn pem_round_trip_preserves_identity() {
        let kp = MediatorKeyPair::generate();
        let pem_str = kp.to_pem();
        let reloaded = MediatorKeyPair::from_pem(&pem_str).unwrap();
        assert_eq!(kp.mediator_id, reloaded.mediator_id);
    }

    #[test]
    fn tampered_message_fails_verification() {
        let kp = MediatorKeyPair::generate();
        let sig = kp.sign_hex(b"original");
        assert!(verify_signature(&kp.public_key_hex(), b"tampered", &sig).is_err());
    }
}
