// Keystore module - stores secp256k1 key pairs as JWK files

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use credkit_crypto::{Jwk, KeyPair};

/// Writes `key` as a private JWK.
///
/// The parent directory is created when missing. On unix the file is
/// readable by its owner only.
///
/// # Arguments
/// * `path` - Destination file
/// * `key` - Key pair to store; must hold a private scalar
/// * `force` - Overwrite an existing file
pub fn save_key(path: &Path, key: &KeyPair, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "Key file '{}' already exists. Use --force to overwrite",
            path.display()
        ));
    }
    if key.is_public_only() {
        return Err(anyhow!("Refusing to store a public-only key as a signing key"));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create '{}'", parent.display()))?;
    }

    let jwk = key.to_jwk(true)?;
    let json = serde_json::to_string_pretty(&jwk)?;

    write_private_file(path, json.as_bytes())
}

/// Writes `content` to a file only its owner can read.
///
/// On unix the file is created with mode 0o600, and an existing file is
/// narrowed to 0o600 before any content is written.
pub fn write_private_file(path: &Path, content: &[u8]) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to open '{}'", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(content)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    file.flush()?;
    Ok(())
}

/// Loads a key pair from a JWK file.
///
/// A JWK without `d` loads as a public-only key, which is enough for
/// verification.
pub fn load_key(path: &Path) -> Result<KeyPair> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read key file '{}'. Run 'credkit key generate' first",
            path.display()
        )
    })?;

    let jwk: Jwk = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JWK in '{}'", path.display()))?;

    KeyPair::from_jwk(&jwk).with_context(|| format!("Invalid key in '{}'", path.display()))
}

/// Loads a key that can sign.
pub fn load_signing_key(path: &Path) -> Result<KeyPair> {
    let key = load_key(path)?;
    if key.is_public_only() {
        return Err(anyhow!(
            "Key file '{}' holds a public key only and cannot sign",
            path.display()
        ));
    }
    Ok(key)
}
