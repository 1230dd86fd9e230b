// Settings for the credkit CLI
//
// Every setting is a global flag with an environment fallback. `Settings`
// resolves and validates them once per invocation; secrets that were not
// supplied are prompted for only when a command needs them.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::Args;
use credkit_crypto::CipherParams;

pub const DEFAULT_KEY_ID: &str = "signingKey";
pub const DEFAULT_LOG_N: u8 = 14;

/// Largest scrypt cost accepted from the command line (N = 2^22, 4 GiB at r = 8).
const MAX_LOG_N: u8 = 22;

#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Secret for encrypt/decrypt and keyed digests
    #[arg(long, env = "CREDKIT_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Client secret for request digests
    #[arg(long, env = "CREDKIT_CLIENT_SECRET", global = true, hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Path to the JWK key file (defaults to ~/.credkit/key.jwk)
    #[arg(long, env = "CREDKIT_KEY", global = true)]
    pub key: Option<PathBuf>,

    /// DID of the signer
    #[arg(long, env = "CREDKIT_DID", global = true)]
    pub did: Option<String>,

    /// Key id used in proofs and published keys
    #[arg(long, env = "CREDKIT_KEY_ID", global = true, default_value = DEFAULT_KEY_ID)]
    pub key_id: String,

    /// scrypt cost as log2(N)
    #[arg(long, env = "CREDKIT_SCRYPT_LOG_N", global = true, default_value_t = DEFAULT_LOG_N)]
    pub scrypt_log_n: u8,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

/// Validated settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    secret: Option<String>,
    client_secret: Option<String>,
    key_path: PathBuf,
    did: Option<String>,
    key_id: String,
    cipher_params: CipherParams,
}

impl Settings {
    /// Resolves the global options.
    ///
    /// This function:
    /// 1. Rejects an empty key id and a DID without the `did:` scheme
    /// 2. Checks the scrypt cost is within 1..=22
    /// 3. Falls back to the default key path when `--key` is absent
    pub fn resolve(opts: &GlobalOpts) -> Result<Self> {
        // Step 1: Identity settings
        let key_id = opts.key_id.trim();
        if key_id.is_empty() {
            return Err(anyhow!("Key id must not be empty"));
        }
        if key_id.contains('#') {
            return Err(anyhow!("Key id '{}' must not contain '#'", key_id));
        }

        let did = match opts.did.as_deref().map(str::trim) {
            Some(did) if !did.starts_with("did:") => {
                return Err(anyhow!("Invalid DID '{}': expected a 'did:' prefix", did));
            }
            Some(did) => Some(did.to_string()),
            None => None,
        };

        // Step 2: Cipher cost
        if opts.scrypt_log_n == 0 || opts.scrypt_log_n > MAX_LOG_N {
            return Err(anyhow!(
                "scrypt log N must be between 1 and {}, got {}",
                MAX_LOG_N,
                opts.scrypt_log_n
            ));
        }

        // Step 3: Key location
        let key_path = match &opts.key {
            Some(path) => path.clone(),
            None => default_key_path()?,
        };

        Ok(Self {
            secret: opts.secret.clone(),
            client_secret: opts.client_secret.clone(),
            key_path,
            did,
            key_id: key_id.to_string(),
            cipher_params: CipherParams {
                log_n: opts.scrypt_log_n,
                ..CipherParams::default()
            },
        })
    }

    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn cipher_params(&self) -> CipherParams {
        self.cipher_params
    }

    /// The signer DID, required by issuing commands.
    pub fn did(&self) -> Result<&str> {
        self.did
            .as_deref()
            .ok_or_else(|| anyhow!("No DID configured. Pass --did or set CREDKIT_DID"))
    }

    /// The cipher/hasher secret, prompting when it was not supplied.
    pub fn secret(&self) -> Result<String> {
        secret_or_prompt(self.secret.as_deref(), "Secret: ")
    }

    /// The request digest secret, prompting when it was not supplied.
    pub fn client_secret(&self) -> Result<String> {
        secret_or_prompt(self.client_secret.as_deref(), "Client secret: ")
    }
}

fn secret_or_prompt(value: Option<&str>, prompt: &str) -> Result<String> {
    let secret = match value {
        Some(secret) => secret.to_string(),
        None => rpassword::prompt_password(prompt)
            .map_err(|e| anyhow!("Failed to read secret: {}", e))?,
    };

    if secret.is_empty() {
        return Err(anyhow!("Secret must not be empty"));
    }
    Ok(secret)
}

/// Default key file location (~/.credkit/key.jwk)
pub fn default_key_path() -> Result<PathBuf> {
    #[cfg(unix)]
    let home = std::env::var("HOME").map_err(|_| anyhow!("HOME environment variable not set"))?;

    #[cfg(windows)]
    let home = std::env::var("USERPROFILE")
        .map_err(|_| anyhow!("USERPROFILE environment variable not set"))?;

    Ok(PathBuf::from(home).join(".credkit").join("key.jwk"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> GlobalOpts {
        GlobalOpts {
            secret: Some("s3cret".to_string()),
            client_secret: None,
            key: Some(PathBuf::from("/tmp/key.jwk")),
            did: Some("did:unid:test:abc".to_string()),
            key_id: DEFAULT_KEY_ID.to_string(),
            scrypt_log_n: DEFAULT_LOG_N,
            log_level: "warn".to_string(),
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(&opts()).expect("resolve should succeed");

        assert_eq!(settings.key_id(), "signingKey");
        assert_eq!(settings.did().unwrap(), "did:unid:test:abc");
        assert_eq!(settings.key_path(), Path::new("/tmp/key.jwk"));
        assert_eq!(settings.cipher_params(), CipherParams::default());
        assert_eq!(settings.secret().unwrap(), "s3cret");
    }

    #[test]
    fn test_custom_log_n() {
        let mut opts = opts();
        opts.scrypt_log_n = 10;
        let settings = Settings::resolve(&opts).unwrap();

        assert_eq!(settings.cipher_params().log_n, 10);
        assert_eq!(settings.cipher_params().r, 8);
    }

    #[test]
    fn test_log_n_out_of_range() {
        for log_n in [0, 23, 64] {
            let mut opts = opts();
            opts.scrypt_log_n = log_n;
            let result = Settings::resolve(&opts);
            assert!(result.unwrap_err().to_string().contains("scrypt log N"));
        }
    }

    #[test]
    fn test_invalid_did() {
        let mut opts = opts();
        opts.did = Some("unid:test".to_string());
        let result = Settings::resolve(&opts);
        assert!(result.unwrap_err().to_string().contains("did:"));
    }

    #[test]
    fn test_missing_did() {
        let mut opts = opts();
        opts.did = None;
        let settings = Settings::resolve(&opts).unwrap();
        assert!(settings
            .did()
            .unwrap_err()
            .to_string()
            .contains("CREDKIT_DID"));
    }

    #[test]
    fn test_key_id_validation() {
        let mut opts = opts();
        opts.key_id = "  ".to_string();
        assert!(Settings::resolve(&opts).is_err());

        opts.key_id = "key#1".to_string();
        assert!(Settings::resolve(&opts)
            .unwrap_err()
            .to_string()
            .contains("must not contain '#'"));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut opts = opts();
        opts.secret = Some(String::new());
        let settings = Settings::resolve(&opts).unwrap();
        assert!(settings.secret().unwrap_err().to_string().contains("empty"));
    }
}
