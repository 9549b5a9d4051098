use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use clap::{Parser, Subcommand};
use keyseal::crypto::{NONCE_LEN, TAG_LEN};
use keyseal::{
    CipherError, Envelope, ExportedKey, KdfParams, KeyOptions, KeyUsages, Storage, SymmetricKey,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod auth;

#[derive(Debug, clap::Args)]
struct SaltArgs {
    /// Salt given as text (UTF-8 bytes are used)
    #[arg(long, conflicts_with_all = ["salt_hex", "salt_b64"])]
    salt: Option<String>,

    /// Salt given as hex bytes
    #[arg(long = "salt-hex", value_name = "HEX", conflicts_with = "salt_b64")]
    salt_hex: Option<String>,

    /// Salt given as base64url bytes
    #[arg(long = "salt-b64", value_name = "BASE64URL")]
    salt_b64: Option<String>,

    /// PBKDF2 iterations; may only be raised (default: 600000)
    #[arg(long, env = "KEYSEAL_ITERATIONS")]
    iterations: Option<u32>,
}

impl SaltArgs {
    fn is_set(&self) -> bool {
        self.salt.is_some() || self.salt_hex.is_some() || self.salt_b64.is_some()
    }

    fn salt_bytes(&self) -> Result<Vec<u8>> {
        if let Some(text) = &self.salt {
            return Ok(text.as_bytes().to_vec());
        }
        if let Some(hex) = &self.salt_hex {
            return from_hex(hex).context("--salt-hex is not valid hex");
        }
        if let Some(b64) = &self.salt_b64 {
            return URL_SAFE_NO_PAD
                .decode(b64.trim_end_matches('='))
                .context("--salt-b64 is not valid base64url");
        }
        bail!("a salt is required (--salt, --salt-hex or --salt-b64)")
    }

    fn kdf_params(&self) -> Result<KdfParams> {
        Ok(match self.iterations {
            Some(n) => KdfParams::new(n)?,
            None => KdfParams::default(),
        })
    }

    async fn derive(&self, options: KeyOptions) -> Result<SymmetricKey> {
        let salt = self.salt_bytes()?;
        let kdf = self.kdf_params()?;
        let secret = auth::read_secret()?;

        Ok(keyseal::derive_key_with_params(secret.as_bytes(), &salt, options, kdf).await?)
    }
}

#[derive(Debug, clap::Args)]
struct KeyArgs {
    /// Path to a JWK key file
    #[arg(long, value_name = "PATH", env = "KEYSEAL_KEY")]
    key: Option<PathBuf>,

    #[command(flatten)]
    derive: SaltArgs,
}

impl KeyArgs {
    /// Derivation flags win over a key file so `KEYSEAL_KEY` can stay set.
    async fn resolve(&self) -> Result<SymmetricKey> {
        if self.derive.is_set() {
            return self.derive.derive(KeyOptions::default()).await;
        }

        let Some(path) = &self.key else {
            bail!("no key given: pass --key <PATH> or --salt/--salt-hex/--salt-b64");
        };

        let json = Storage::new(path.clone()).load_string()?;
        let jwk = ExportedKey::from_json(&json)?;
        let key = keyseal::import_key(&jwk, None, false)
            .await
            .with_context(|| format!("failed to import key from {}", path.display()))?;
        debug!(path = %path.display(), usages = ?key.usages(), "key imported");
        Ok(key)
    }
}

#[derive(Debug, Parser)]
#[command(name = "keyseal")]
#[command(
    version,
    about = "AES-GCM envelope encryption with PBKDF2-derived or JWK keys."
)]
struct Cli {
    /// Show full decryption error detail (malformed vs. authentication)
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Derives a key from a secret and writes it as a JWK file
    Derive {
        #[command(flatten)]
        salt: SaltArgs,

        /// Where to write the JWK (refuses to overwrite)
        #[arg(long, value_name = "PATH")]
        out: PathBuf,

        /// Restrict the key to encryption
        #[arg(long, conflicts_with = "decrypt_only")]
        encrypt_only: bool,

        /// Restrict the key to decryption
        #[arg(long)]
        decrypt_only: bool,
    },

    /// Encrypts a file into an envelope
    Encrypt {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long = "in", value_name = "PATH")]
        input: PathBuf,

        #[arg(long, value_name = "PATH")]
        out: PathBuf,
    },

    /// Decrypts an envelope (to stdout unless --out is given)
    Decrypt {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long = "in", value_name = "PATH")]
        input: PathBuf,

        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Shows the framing of an envelope without decrypting it
    Inspect {
        #[arg(long = "in", value_name = "PATH")]
        input: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        bail!("expected an even number of hex digits");
    }
    if let Some(i) = s.find(|c: char| !c.is_ascii_hexdigit()) {
        bail!("unexpected character at offset {i}");
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(anyhow::Error::from))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Cli::parse();

    match args.command {
        Commands::Derive {
            salt,
            out,
            encrypt_only,
            decrypt_only,
        } => {
            let usages = if encrypt_only {
                KeyUsages::ENCRYPT
            } else if decrypt_only {
                KeyUsages::DECRYPT
            } else {
                KeyUsages::ALL
            };
            let options = KeyOptions::default().extractable(true).usages(usages);

            let key = salt.derive(options).await?;
            let jwk = keyseal::export_key(&key).await?;
            Storage::new(out.clone()).create(jwk.to_json()?.as_bytes())?;

            info!(path = %out.display(), "key written");
            println!("key written to {}", out.display());
        }
        Commands::Encrypt { key, input, out } => {
            let key = key.resolve().await?;
            let plaintext = zeroize::Zeroizing::new(Storage::new(input).load()?);

            let envelope = keyseal::encrypt(&key, &plaintext).await?;
            Storage::new(out.clone()).save(&envelope)?;

            println!("encrypted {} bytes to {}", plaintext.len(), out.display());
        }
        Commands::Decrypt { key, input, out } => {
            let key = key.resolve().await?;
            let envelope = Storage::new(input).load()?;

            let plaintext = match keyseal::decrypt(&key, &envelope).await {
                Ok(p) => p,
                Err(e) if args.verbose => return Err(e.into()),
                Err(e) => bail!(e.redacted()),
            };

            match out {
                Some(path) => Storage::new(path).save(&plaintext)?,
                None => {
                    let mut stdout = io::stdout().lock();
                    stdout.write_all(&plaintext)?;
                    stdout.flush()?;
                }
            }
        }
        Commands::Inspect { input } => {
            let data = Storage::new(input).load()?;
            let envelope = Envelope::from_bytes(&data).map_err(|e: CipherError| {
                if args.verbose {
                    anyhow::Error::from(e)
                } else {
                    anyhow::anyhow!(e.redacted())
                }
            })?;

            let ct_len = envelope.ciphertext().len();
            println!("nonce:      {} ({NONCE_LEN} bytes)", hex(envelope.nonce()));
            println!("ciphertext: {} bytes", ct_len.saturating_sub(TAG_LEN));
            println!("tag:        {TAG_LEN} bytes");
            println!("total:      {} bytes", data.len());
            if ct_len < TAG_LEN {
                println!("warning:    shorter than an authentication tag");
            }
        }
    }

    Ok(())
}
