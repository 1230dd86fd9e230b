// credkit CLI - Command-line interface for the credkit crypto layer

mod claims;
mod config;
mod keystore;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use credkit_crypto::document::{new_credential, new_presentation};
use credkit_crypto::encoding::{base64_decode, base64_encode};
use credkit_crypto::{
    cipher, commitment, credential, hasher, CredentialKind, CredentialSuite, Document, KeyPair,
    VerificationSuite,
};
use serde_json::Value;
use tracing::debug;

use config::{GlobalOpts, Settings};

/// credkit - Keys, encryption, digests and signed credentials
#[derive(Parser)]
#[command(name = "credkit")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the signing key (generate, show)
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// Encrypt a file with the configured secret
    Encrypt {
        /// Path to the plaintext file
        path: PathBuf,

        /// Write the base64 blob here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Decrypt a base64 blob with the configured secret
    Decrypt {
        /// Path to the base64 blob
        path: PathBuf,

        /// Write the plaintext here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Keyed HMAC-SHA512 digests
    Digest {
        #[command(subcommand)]
        action: DigestAction,
    },
    /// Request digests over a URI and JSON payload
    RequestDigest {
        #[command(subcommand)]
        action: RequestDigestAction,
    },
    /// Issue, sign, verify and present credentials
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
    /// Hash commitments over canonical JSON
    Commitment {
        #[command(subcommand)]
        action: CommitmentAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Generate a new secp256k1 key
    Generate {
        /// Output file (defaults to --key)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite existing key file
        #[arg(short, long)]
        force: bool,
    },
    /// Show the public key payload for the configured key
    Show {
        /// Key purposes (can be specified multiple times)
        #[arg(short, long = "purpose", default_values_t = ["auth".to_string(), "general".to_string()])]
        purposes: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DigestAction {
    /// Print the digest of a file
    Create {
        path: PathBuf,
    },
    /// Check a file against a hex digest
    Verify {
        path: PathBuf,
        digest: String,
    },
}

#[derive(Subcommand)]
enum RequestDigestAction {
    /// Print the digest of a request
    Create {
        /// Request URI, e.g. /api/v1/create
        uri: String,
        /// Path to the JSON payload
        path: PathBuf,
    },
    /// Check a request against a hex digest
    Verify {
        uri: String,
        path: PathBuf,
        digest: String,
    },
}

#[derive(Subcommand)]
enum CredentialAction {
    /// Build and sign a new credential
    Issue {
        /// Credential type tag, e.g. EmailCredentialV1
        #[arg(short = 't', long = "type", value_name = "TYPE")]
        kind: String,

        /// JSON-LD context for the type (defaults to the catalogue context)
        #[arg(long)]
        context: Option<String>,

        /// Subject claims (can be specified multiple times)
        #[arg(short, long = "claim", value_name = "KEY=VALUE")]
        claims: Vec<String>,

        /// Subject DID (defaults to the signer DID)
        #[arg(long)]
        subject: Option<String>,

        /// Expiration date (RFC 3339)
        #[arg(long)]
        expires: Option<String>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Attach a proof to a JSON object
    Sign {
        path: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify the proof of a credential or presentation
    Verify {
        path: PathBuf,
    },
    /// Wrap signed credentials in a signed presentation
    Present {
        /// Paths to signed credentials
        #[arg(value_name = "CREDENTIAL", required = true)]
        paths: Vec<PathBuf>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the credential of one type from a presentation
    Select {
        path: PathBuf,

        #[arg(short = 't', long = "type", value_name = "TYPE")]
        kind: String,
    },
}

#[derive(Subcommand)]
enum CommitmentAction {
    /// Print the commitment to a JSON document
    Create {
        path: PathBuf,
    },
    /// Check a revealed JSON document against a commitment
    Verify {
        path: PathBuf,
        commitment: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level);

    let result = match Settings::resolve(&cli.global) {
        Ok(settings) => run(cli.command, &settings).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("credkit={level},credkit_crypto={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Commands::Key { action } => handle_key(action, settings),
        Commands::Encrypt { path, output } => {
            handle_encrypt(&path, output.as_deref(), settings).await
        }
        Commands::Decrypt { path, output } => {
            handle_decrypt(&path, output.as_deref(), settings).await
        }
        Commands::Digest { action } => handle_digest(action, settings),
        Commands::RequestDigest { action } => handle_request_digest(action, settings),
        Commands::Credential { action } => handle_credential(action, settings),
        Commands::Commitment { action } => handle_commitment(action),
    }
}

fn handle_key(action: KeyAction, settings: &Settings) -> anyhow::Result<()> {
    match action {
        KeyAction::Generate { output, force } => {
            let path = output.as_deref().unwrap_or(settings.key_path());
            let key = KeyPair::generate()?;
            keystore::save_key(path, &key, force)?;

            println!("{} Key generated", "✓".green().bold());
            println!();
            println!("  File:   {}", path.display());
            println!("  Public: {}", public_preview(&key));
            println!();
            println!("Keep this file private - it holds the signing key!");
            Ok(())
        }
        KeyAction::Show { purposes } => {
            let key = keystore::load_key(settings.key_path())?;
            let purposes: Vec<&str> = purposes.iter().map(String::as_str).collect();
            let payload = key.to_public_key(settings.key_id(), &purposes)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
    }
}

async fn handle_encrypt(
    path: &Path,
    output: Option<&Path>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let content = read_bytes(path)?;
    let secret = settings.secret()?;

    let blob = cipher::encrypt_async(settings.cipher_params(), content, secret.into_bytes()).await?;
    debug!(blob_len = blob.len(), "encrypted file");

    let mut encoded = base64_encode(&blob);
    encoded.push('\n');
    write_output(output, encoded.as_bytes())
}

async fn handle_decrypt(
    path: &Path,
    output: Option<&Path>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let encoded = read_text(path)?;
    let blob = base64_decode(&encoded)
        .with_context(|| format!("'{}' is not a base64 blob", path.display()))?;
    let secret = settings.secret()?;

    let plaintext = cipher::decrypt_async(settings.cipher_params(), blob, secret.into_bytes())
        .await
        .context("Decryption failed (wrong secret or scrypt cost?)")?;

    write_private_output(output, &plaintext)
}

fn handle_digest(action: DigestAction, settings: &Settings) -> anyhow::Result<()> {
    match action {
        DigestAction::Create { path } => {
            let content = read_bytes(&path)?;
            let secret = settings.secret()?;
            println!("{}", hasher::digest(&content, secret.as_bytes())?);
            Ok(())
        }
        DigestAction::Verify { path, digest } => {
            let content = read_bytes(&path)?;
            let secret = settings.secret()?;
            let valid = hasher::verify(&content, digest.trim(), secret.as_bytes())?;
            report("Digest", valid)
        }
    }
}

fn handle_request_digest(action: RequestDigestAction, settings: &Settings) -> anyhow::Result<()> {
    match action {
        RequestDigestAction::Create { uri, path } => {
            let payload = read_text(&path)?;
            let secret = settings.client_secret()?;
            let digest = hasher::generate_request_digest(&uri, &payload, secret.as_bytes())?;
            println!("{}", digest);
            Ok(())
        }
        RequestDigestAction::Verify { uri, path, digest } => {
            let payload = read_text(&path)?;
            let secret = settings.client_secret()?;
            let valid =
                hasher::verify_request_digest(&uri, &payload, digest.trim(), secret.as_bytes())?;
            report("Request digest", valid)
        }
    }
}

fn handle_credential(action: CredentialAction, settings: &Settings) -> anyhow::Result<()> {
    match action {
        CredentialAction::Issue {
            kind,
            context,
            claims,
            subject,
            expires,
            output,
        } => {
            let did = settings.did()?;
            let key = keystore::load_signing_key(settings.key_path())?;
            let kind = CredentialKind::from_tag(&kind);

            let subject_did = subject.as_deref().unwrap_or(did);
            let subject = claims::parse_claims(&claims, Some(subject_did))?;
            let expires = expires.as_deref().map(normalize_date).transpose()?;

            let now = credential::created_now();
            let unsigned =
                new_credential(&kind, context.as_deref(), subject, did, &now, expires.as_deref())?;
            let signed = credential::sign_at(&unsigned, &suite(did, settings, &key), &now)?;

            write_json(output.as_deref(), &signed)
        }
        CredentialAction::Sign { path, output } => {
            let did = settings.did()?;
            let key = keystore::load_signing_key(settings.key_path())?;
            let object = read_json(&path)?;

            let signed = credential::sign(&object, &suite(did, settings, &key))?;
            write_json(output.as_deref(), &signed)
        }
        CredentialAction::Verify { path } => handle_credential_verify(&path, settings),
        CredentialAction::Present { paths, output } => {
            let did = settings.did()?;
            let key = keystore::load_signing_key(settings.key_path())?;
            let credentials = paths
                .iter()
                .map(|p| read_json(p))
                .collect::<anyhow::Result<Vec<Value>>>()?;

            let now = credential::created_now();
            let unsigned = new_presentation(credentials, did, &now, None)?;
            let signed = credential::sign_at(&unsigned, &suite(did, settings, &key), &now)?;

            write_json(output.as_deref(), &signed)
        }
        CredentialAction::Select { path, kind } => {
            let presentation = match Document::decode(read_json(&path)?) {
                Document::Presentation(vp) => vp,
                _ => return Err(anyhow!("'{}' is not a presentation", path.display())),
            };

            let kind = CredentialKind::from_tag(&kind);
            let selected = presentation
                .select(&kind)?
                .ok_or_else(|| anyhow!("No credential of type '{}' in presentation", kind))?;
            write_json(None, selected)
        }
    }
}

fn handle_credential_verify(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    let object = read_json(path)?;
    let key = keystore::load_key(settings.key_path())?;

    let verified = credential::verify(
        &object,
        &VerificationSuite {
            key_id: settings.key_id(),
            key: &key,
        },
    );

    match verified {
        Ok(payload) if payload.is_valid => {
            println!("{} {}", "✓".green().bold(), "Proof verified".green());
            println!();

            match Document::decode(object) {
                Document::Credential(vc) => {
                    let meta = vc.metadata()?;
                    println!("  Type:    {}", meta.kind);
                    println!("  Issuer:  {}", truncate_did(&meta.issuer_did));
                    println!("  Issued:  {}", meta.issuance_date.to_rfc3339());
                    if let Some(expiration) = meta.expiration_date {
                        println!("  Expires: {}", expiration.to_rfc3339());
                    }
                }
                Document::Presentation(vp) => {
                    let meta = vp.metadata()?;
                    println!("  Issuer:      {}", truncate_did(&meta.issuer_did));
                    println!("  Issued:      {}", meta.issuance_date.to_rfc3339());
                    println!("  Credentials: {}", meta.credential_types.join(", "));
                }
                Document::Unrecognized(_) => {
                    println!("  Document: not a credential or presentation");
                }
            }
            Ok(())
        }
        Ok(_) => report("Proof", false),
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), "Proof verification failed".red());
            eprintln!();
            eprintln!("  Error: {}", e);
            Err(e.into())
        }
    }
}

fn handle_commitment(action: CommitmentAction) -> anyhow::Result<()> {
    match action {
        CommitmentAction::Create { path } => {
            let object = read_json(&path)?;
            println!(
                "{}",
                commitment::canonicalize_then_double_hash_then_encode(&object)?
            );
            Ok(())
        }
        CommitmentAction::Verify { path, commitment } => {
            let object = read_json(&path)?;
            let valid = commitment::canonicalize_and_verify_double_hash(&object, commitment.trim());
            report("Commitment", valid)
        }
    }
}

fn suite<'a>(did: &'a str, settings: &'a Settings, key: &'a KeyPair) -> CredentialSuite<'a> {
    CredentialSuite {
        did,
        key_id: settings.key_id(),
        key,
    }
}

/// Prints the outcome of a check; a mismatch is an error.
fn report(what: &str, valid: bool) -> anyhow::Result<()> {
    if valid {
        println!("{} {}", "✓".green().bold(), format!("{} matches", what).green());
        Ok(())
    } else {
        eprintln!("{} {}", "✗".red().bold(), format!("{} does not match", what).red());
        Err(anyhow!("{} verification failed", what))
    }
}

/// Accepts any RFC 3339 timestamp and renders it as `YYYY-MM-DDTHH:mm:ssZ`.
fn normalize_date(input: &str) -> anyhow::Result<String> {
    let parsed = chrono::DateTime::parse_from_rfc3339(input.trim())
        .with_context(|| format!("Invalid date '{}': expected RFC 3339", input))?;
    Ok(parsed
        .with_timezone(&chrono::Utc)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
}

/// Truncates a DID for readability: "did:unid:test:EiBp...last8chars"
fn truncate_did(did: &str) -> String {
    if did.len() <= 30 || !did.is_ascii() {
        return did.to_string();
    }
    let prefix = &did[..20];
    let suffix = &did[did.len() - 8..];
    format!("{}...{}", prefix, suffix)
}

/// Shortened hex of the uncompressed public point.
fn public_preview(key: &KeyPair) -> String {
    let encoded = key.to_hex().public;
    format!("{}...{}", &encoded[..16], &encoded[encoded.len() - 8..])
}

fn read_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let content = read_text(path)?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON in '{}'", path.display()))
}

fn write_json(output: Option<&Path>, value: &Value) -> anyhow::Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    write_output(output, json.as_bytes())
}

fn write_stdout(content: &[u8]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(content)?;
    stdout.flush()?;
    Ok(())
}

/// Writes a public artifact to `output` (mode 0o644), or stdout when no path is given.
fn write_output(output: Option<&Path>, content: &[u8]) -> anyhow::Result<()> {
    let Some(path) = output else {
        return write_stdout(content);
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
    }

    eprintln!("Written to: {}", path.display());
    Ok(())
}

/// Writes confidential output to an owner-only file, or stdout when no path is given.
fn write_private_output(output: Option<&Path>, content: &[u8]) -> anyhow::Result<()> {
    let Some(path) = output else {
        return write_stdout(content);
    };

    keystore::write_private_file(path, content)?;
    eprintln!("Written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_issue() {
        let cli = Cli::try_parse_from([
            "credkit",
            "--did",
            "did:unid:test:abc",
            "credential",
            "issue",
            "--type",
            "EmailCredentialV1",
            "--claim",
            "email=alice@example.com",
            "-c",
            "@type=EmailPerson",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.global.did.as_deref(), Some("did:unid:test:abc"));
        match cli.command {
            Commands::Credential {
                action: CredentialAction::Issue { kind, claims, .. },
            } => {
                assert_eq!(kind, "EmailCredentialV1");
                assert_eq!(claims.len(), 2);
            }
            _ => panic!("expected credential issue"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "credkit",
            "encrypt",
            "plain.txt",
            "--scrypt-log-n",
            "10",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.global.scrypt_log_n, 10);
    }

    #[test]
    fn test_present_requires_credentials() {
        let result = Cli::try_parse_from(["credkit", "credential", "present"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_key_show_default_purposes() {
        let cli = Cli::try_parse_from(["credkit", "key", "show"]).unwrap();
        match cli.command {
            Commands::Key {
                action: KeyAction::Show { purposes },
            } => assert_eq!(purposes, vec!["auth", "general"]),
            _ => panic!("expected key show"),
        }
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(
            normalize_date("2027-01-31T21:00:00+09:00").unwrap(),
            "2027-01-31T12:00:00Z"
        );
        assert!(normalize_date("tomorrow")
            .unwrap_err()
            .to_string()
            .contains("RFC 3339"));
    }

    #[test]
    fn test_truncate_did() {
        assert_eq!(truncate_did("did:unid:short"), "did:unid:short");
        assert_eq!(
            truncate_did("did:unid:test:EiBprXreMiba4loyl3psXm0RsECdtlCiQIjM8G9BtdQplA"),
            "did:unid:test:EiBprX...9BtdQplA"
        );
    }

    #[test]
    fn test_report() {
        assert!(report("Digest", true).is_ok());
        assert!(report("Digest", false)
            .unwrap_err()
            .to_string()
            .contains("Digest verification failed"));
    }

    #[test]
    fn test_public_preview() {
        let key = KeyPair::generate().unwrap();
        let preview = public_preview(&key);
        let full = key.to_hex().public;

        assert!(preview.starts_with("04"));
        assert!(preview.starts_with(&full[..16]));
        assert!(preview.ends_with(&full[full.len() - 8..]));
    }

    fn settings_for(dir: &Path) -> Settings {
        Settings::resolve(&GlobalOpts {
            secret: Some("pw".to_string()),
            client_secret: None,
            key: Some(dir.join("key.jwk")),
            did: None,
            key_id: config::DEFAULT_KEY_ID.to_string(),
            scrypt_log_n: 4,
            log_level: "warn".to_string(),
        })
        .expect("settings should resolve")
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_decrypted_output_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let settings = settings_for(dir.path());
        let plain = dir.path().join("plain.txt");
        let blob = dir.path().join("blob.b64");
        let out = dir.path().join("out.txt");
        std::fs::write(&plain, "top secret").unwrap();

        handle_encrypt(&plain, Some(blob.as_path()), &settings)
            .await
            .expect("encrypt should succeed");
        handle_decrypt(&blob, Some(out.as_path()), &settings)
            .await
            .expect("decrypt should succeed");

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "top secret");
        let mode = std::fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_decrypt_narrows_existing_output_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let settings = settings_for(dir.path());
        let plain = dir.path().join("plain.txt");
        let blob = dir.path().join("blob.b64");
        let out = dir.path().join("out.txt");
        std::fs::write(&plain, "top secret").unwrap();
        std::fs::write(&out, "stale").unwrap();
        std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o644)).unwrap();

        handle_encrypt(&plain, Some(blob.as_path()), &settings).await.unwrap();
        handle_decrypt(&blob, Some(out.as_path()), &settings).await.unwrap();

        let mode = std::fs::metadata(&out).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_commands_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("doc.json");
        std::fs::write(&source, r#"{"b":"world","a":"hello"}"#).unwrap();

        let value = read_json(&source).unwrap();
        let target = dir.path().join("copy.json");
        write_json(Some(target.as_path()), &value).unwrap();

        assert_eq!(read_json(&target).unwrap(), value);
        assert!(read_json(&dir.path().join("missing.json"))
            .unwrap_err()
            .to_string()
            .contains("Failed to read"));
    }
}
