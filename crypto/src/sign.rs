//! Ed25519 message signing and verification.

use bos_types::{ChainAddress, PrivateKey, Signature};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature::new(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and the signer's address.
///
/// Returns `false` for malformed keys as well as bad signatures.
pub fn verify_signature(message: &[u8], signature: &Signature, signer: &ChainAddress) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying_key.verify_strict(message, &dalek_sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify() {
        let kp = generate_keypair();
        let msg = b"contribution to bounty";
        let sig = sign_message(msg, &kp.private);
        assert!(verify_signature(msg, &sig, &kp.address));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = generate_keypair();
        let sig = sign_message(b"correct message", &kp.private);
        assert!(!verify_signature(b"wrong message", &sig, &kp.address));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = generate_keypair();
        let kp2 = generate_keypair();
        let sig = sign_message(b"test", &kp1.private);
        assert!(!verify_signature(b"test", &sig, &kp2.address));
    }

    #[test]
    fn signature_deterministic() {
        let kp = keypair_from_seed(&[99u8; 32]);
        let sig1 = sign_message(b"deterministic", &kp.private);
        let sig2 = sign_message(b"deterministic", &kp.private);
        assert_eq!(sig1, sig2);
    }
}
