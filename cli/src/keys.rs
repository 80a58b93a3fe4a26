//! Signing key loading for the CLI.
//!
//! A signer comes either from the encrypted keystore written by `keygen` or
//! from an unencrypted Solana CLI key file passed with `--keypair`.

use std::path::Path;

use anyhow::{bail, Context};
use bos_types::{ChainAddress, KeyPair};
use bos_wallet_core::{decrypt_keypair, load_keystore, load_solana_keypair, save_keystore, KeystoreFile};
use rpassword::prompt_password;

/// Read the keystore password from here before prompting.
pub const PASSWORD_ENV: &str = "BOS_KEYSTORE_PASSWORD";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySource<'a> {
    Keystore(&'a Path),
    SolanaFile(&'a Path),
}

impl<'a> KeySource<'a> {
    pub fn new(keystore: &'a Path, keypair_file: Option<&'a Path>) -> Self {
        match keypair_file {
            Some(path) => Self::SolanaFile(path),
            None => Self::Keystore(keystore),
        }
    }

    /// The signer's address. Never asks for a password.
    pub fn address(&self) -> anyhow::Result<ChainAddress> {
        match self {
            Self::Keystore(path) => Ok(read_keystore(path)?.address),
            Self::SolanaFile(path) => Ok(read_solana_file(path)?.address),
        }
    }

    pub fn load(&self) -> anyhow::Result<KeyPair> {
        match self {
            Self::Keystore(path) => {
                let keystore = read_keystore(path)?;
                let password = read_password(&format!("Password for {}: ", keystore.address))?;
                decrypt_keypair(&keystore, &password)
                    .with_context(|| format!("failed to unlock {}", path.display()))
            }
            Self::SolanaFile(path) => read_solana_file(path),
        }
    }
}

fn read_keystore(path: &Path) -> anyhow::Result<KeystoreFile> {
    load_keystore(path).with_context(|| {
        format!(
            "failed to read keystore {} (create one with `book-of-scams keygen`)",
            path.display()
        )
    })
}

fn read_solana_file(path: &Path) -> anyhow::Result<KeyPair> {
    load_solana_keypair(path).with_context(|| format!("failed to read key file {}", path.display()))
}

pub fn read_password(prompt: &str) -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    prompt_password(prompt).context("failed to read password")
}

/// Ask for a new password twice.
pub fn new_password() -> anyhow::Result<String> {
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => {
            let first = prompt_password("New keystore password: ").context("failed to read password")?;
            let second = prompt_password("Confirm password: ").context("failed to confirm password")?;
            if first != second {
                bail!("passwords did not match");
            }
            first
        }
    };
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

/// Save `keystore`, creating its directory if needed.
pub fn write_keystore(keystore: &KeystoreFile, path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    save_keystore(keystore, path).with_context(|| format!("failed to write {}", path.display()))
}
