//! Password-protected key files for the local keypair wallet.
//!
//! The 32-byte Ed25519 seed is sealed with AES-256-GCM under a key derived by
//! Argon2id from the user's password. The public address is stored in the clear
//! so a key file can be identified without the password.
//!
//! Unencrypted Solana CLI key files (a JSON array of 64 bytes, secret then
//! public) can also be loaded.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use bos_crypto::{keypair_from_bytes, keypair_from_seed};
use bos_types::{ChainAddress, KeyPair};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::KeystoreError;

const KEYSTORE_VERSION: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;
const SALT_LEN: usize = 16;
/// 96-bit AES-GCM nonce.
const NONCE_LEN: usize = 12;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeystoreFile {
    pub version: u32,
    pub address: ChainAddress,
    pub crypto: KeystoreCrypto,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeystoreCrypto {
    pub cipher: String,
    pub kdf: String,
    pub kdf_params: KdfParams,
    /// Hex-encoded.
    pub salt: String,
    /// Hex-encoded.
    pub nonce: String,
    /// Hex-encoded seed ciphertext with its GCM tag.
    pub ciphertext: String,
}

/// Argon2id cost parameters, recorded in the file so decryption does not depend
/// on the defaults of the build that wrote it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    /// 64 MiB, 3 passes, 1 lane.
    fn default() -> Self {
        Self {
            memory: 65536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// Seal `keypair` under `password` with the default KDF cost.
pub fn encrypt_keypair(keypair: &KeyPair, password: &str) -> Result<KeystoreFile, KeystoreError> {
    encrypt_keypair_with(keypair, password, KdfParams::default())
}

pub fn encrypt_keypair_with(
    keypair: &KeyPair,
    password: &str,
    params: KdfParams,
) -> Result<KeystoreFile, KeystoreError> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);

    let cipher = cipher_for(password, &salt, params)?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), keypair.private.0.as_ref())
        .map_err(|e| KeystoreError::Key(format!("encryption failed: {e}")))?;

    Ok(KeystoreFile {
        version: KEYSTORE_VERSION,
        address: keypair.address,
        crypto: KeystoreCrypto {
            cipher: "aes-256-gcm".to_string(),
            kdf: "argon2id".to_string(),
            kdf_params: params,
            salt: hex::encode(salt),
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        },
    })
}

/// Open a keystore and rebuild the keypair. The derived address must match the
/// one recorded in the file.
pub fn decrypt_keypair(keystore: &KeystoreFile, password: &str) -> Result<KeyPair, KeystoreError> {
    if keystore.version != KEYSTORE_VERSION {
        return Err(KeystoreError::UnsupportedVersion(keystore.version));
    }

    let salt = decode_field("salt", &keystore.crypto.salt)?;
    let nonce_bytes = decode_field("nonce", &keystore.crypto.nonce)?;
    let ciphertext = decode_field("ciphertext", &keystore.crypto.ciphertext)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(KeystoreError::Key(format!(
            "invalid nonce length: expected {NONCE_LEN}, got {}",
            nonce_bytes.len()
        )));
    }

    let cipher = cipher_for(password, &salt, keystore.crypto.kdf_params)?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| KeystoreError::Decrypt)?;
    let seed: [u8; 32] = plaintext.as_slice().try_into().map_err(|_| {
        KeystoreError::Key(format!("decrypted seed has {} bytes, expected 32", plaintext.len()))
    })?;

    let keypair = keypair_from_seed(&seed);
    if keypair.address != keystore.address {
        return Err(KeystoreError::AddressMismatch {
            stored: keystore.address,
            derived: keypair.address,
        });
    }
    Ok(keypair)
}

pub fn save_keystore(keystore: &KeystoreFile, path: &Path) -> Result<(), KeystoreError> {
    let json = serde_json::to_string_pretty(keystore)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_keystore(path: &Path) -> Result<KeystoreFile, KeystoreError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Load an unencrypted Solana CLI key file.
pub fn load_solana_keypair(path: &Path) -> Result<KeyPair, KeystoreError> {
    let json = std::fs::read_to_string(path)?;
    let bytes: Vec<u8> = serde_json::from_str(&json)?;
    keypair_from_bytes(&bytes).map_err(|e| KeystoreError::Key(e.to_string()))
}

fn cipher_for(password: &str, salt: &[u8], params: KdfParams) -> Result<Aes256Gcm, KeystoreError> {
    let params = Params::new(
        params.memory,
        params.iterations,
        params.parallelism,
        Some(ARGON2_OUTPUT_LEN),
    )
    .map_err(|e| KeystoreError::Key(format!("argon2 params: {e}")))?;

    let mut key = [0u8; ARGON2_OUTPUT_LEN];
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| KeystoreError::Key(format!("argon2 hashing failed: {e}")))?;

    Aes256Gcm::new_from_slice(&key).map_err(|e| KeystoreError::Key(format!("aes key init: {e}")))
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, KeystoreError> {
    hex::decode(value).map_err(|e| KeystoreError::Key(format!("invalid {name} hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bos_crypto::generate_keypair;

    // Argon2 minimums; the defaults take too long for unit tests.
    const FAST: KdfParams = KdfParams {
        memory: 8,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let kp = generate_keypair();
        let ks = encrypt_keypair_with(&kp, "hunter2", FAST).unwrap();
        assert_eq!(ks.address, kp.address);
        let back = decrypt_keypair(&ks, "hunter2").unwrap();
        assert_eq!(back.address, kp.address);
        assert_eq!(back.private.0, kp.private.0);
    }

    #[test]
    fn wrong_password_fails() {
        let ks = encrypt_keypair_with(&generate_keypair(), "right", FAST).unwrap();
        assert!(matches!(decrypt_keypair(&ks, "wrong"), Err(KeystoreError::Decrypt)));
    }

    #[test]
    fn kdf_params_are_recorded() {
        let ks = encrypt_keypair_with(&generate_keypair(), "pass", FAST).unwrap();
        assert_eq!(ks.crypto.kdf_params, FAST);
        assert_eq!(ks.crypto.cipher, "aes-256-gcm");
        assert_eq!(ks.crypto.kdf, "argon2id");
    }

    #[test]
    fn default_params() {
        let p = KdfParams::default();
        assert_eq!((p.memory, p.iterations, p.parallelism), (65536, 3, 1));
    }

    #[test]
    fn tampered_address_is_detected() {
        let mut ks = encrypt_keypair_with(&generate_keypair(), "pass", FAST).unwrap();
        ks.address = ChainAddress::new([5u8; 32]);
        assert!(matches!(
            decrypt_keypair(&ks, "pass"),
            Err(KeystoreError::AddressMismatch { .. })
        ));
    }

    #[test]
    fn unsupported_version_rejected() {
        let mut ks = encrypt_keypair_with(&generate_keypair(), "pass", FAST).unwrap();
        ks.version = 99;
        assert!(matches!(
            decrypt_keypair(&ks, "pass"),
            Err(KeystoreError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        let kp = generate_keypair();
        save_keystore(&encrypt_keypair_with(&kp, "pw", FAST).unwrap(), &path).unwrap();

        let loaded = load_keystore(&path).unwrap();
        assert_eq!(decrypt_keypair(&loaded, "pw").unwrap().address, kp.address);
    }

    #[test]
    fn loads_solana_cli_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        let kp = keypair_from_seed(&[3u8; 32]);
        let mut bytes = kp.private.0.to_vec();
        bytes.extend_from_slice(kp.address.as_bytes());
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();

        assert_eq!(load_solana_keypair(&path).unwrap().address, kp.address);
    }

    #[test]
    fn solana_key_file_with_wrong_public_half_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id.json");
        let mut bytes = vec![3u8; 32];
        bytes.extend_from_slice(&[0u8; 32]);
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();

        assert!(matches!(load_solana_keypair(&path), Err(KeystoreError::Key(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_keystore(&dir.path().join("absent.json")),
            Err(KeystoreError::Io(_))
        ));
    }
}
