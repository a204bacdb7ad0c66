//! TenantGate CLI - identity and token management, and the agent join flow.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tenantgate_agent::{BootstrapClient, JoinVerification};
use tenantgate_core::crypto::{parse_public_key, IdentityKey, VerifyingKey};
use tenantgate_core::{BootstrapToken, ClientId};
use tenantgate_gateway::config::load_token_file;

/// TenantGate CLI - Gateway operator and agent tool
#[derive(Parser)]
#[command(name = "tenantgate")]
#[command(about = "CLI for TenantGate bootstrap", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a gateway identity key
    #[command(name = "generate-identity")]
    GenerateIdentity {
        /// Output path for the PKCS#8 PEM key
        #[arg(short, long)]
        out: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Issue a bootstrap token and its signed assertion
    #[command(name = "issue-token")]
    IssueToken {
        /// Gateway identity key
        #[arg(short, long)]
        identity: PathBuf,

        /// Gateway token file to append to
        #[arg(short, long)]
        token_file: PathBuf,

        /// Token lifetime in hours (no expiry if omitted)
        #[arg(long)]
        ttl_hours: Option<i64>,
    },

    /// Bootstrap this agent against a gateway
    #[command(name = "join")]
    Join {
        /// Gateway base URL
        #[arg(short, long, default_value = "http://[::1]:8443")]
        gateway: String,

        /// Bootstrap token (hexid.hexsecret)
        #[arg(long)]
        token: String,

        /// Signed assertion issued with the token
        #[arg(long)]
        assertion: String,

        /// Tenant client ID to register
        #[arg(long)]
        client_id: String,

        /// Gateway identity public key (hex) to verify against
        #[arg(long)]
        pin: Option<String>,

        /// Output path for the keyring JSON
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::GenerateIdentity { out, force } => {
            generate_identity(&out, force)?;
        }
        Commands::IssueToken {
            identity,
            token_file,
            ttl_hours,
        } => {
            issue_token(&identity, &token_file, ttl_hours)?;
        }
        Commands::Join {
            gateway,
            token,
            assertion,
            client_id,
            pin,
            out,
        } => {
            join(&gateway, &token, &assertion, &client_id, pin.as_deref(), &out).await?;
        }
    }

    Ok(())
}

fn generate_identity(out: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let identity = IdentityKey::generate();
    write_private(out, identity.to_pkcs8_pem().as_bytes(), force)?;

    println!("Identity written to {}", out.display());
    println!("Public key: {}", hex::encode(identity.public_key().as_bytes()));

    Ok(())
}

fn issue_token(
    identity_path: &Path,
    token_file: &Path,
    ttl_hours: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let pem = std::fs::read_to_string(identity_path)?;
    let identity = IdentityKey::from_pkcs8_pem(&pem)?;

    let mut token = BootstrapToken::generate();
    if let Some(hours) = ttl_hours {
        token = token.with_ttl(token_ttl(hours)?)?;
    }
    let assertion = identity.sign_compact(&token)?;

    let mut tokens = load_token_file(token_file)?;
    tokens.push(token.clone());
    write_private(token_file, &serde_json::to_vec_pretty(&tokens)?, true)?;
    info!(token_id = %token.hex_id(), path = %token_file.display(), "Token added");

    println!("Token ID:  {}", token.hex_id());
    if let Some(expires_at) = token.metadata().expires_at {
        println!("Expires:   {}", expires_at.to_rfc3339());
    }
    println!("Token:     {}", token.encode_hex());
    println!("Assertion: {}", assertion);

    Ok(())
}

fn token_ttl(hours: i64) -> Result<chrono::Duration, Box<dyn std::error::Error>> {
    chrono::Duration::try_hours(hours)
        .ok_or_else(|| format!("token TTL of {} hours is out of range", hours).into())
}

async fn join(
    gateway: &str,
    token: &str,
    assertion: &str,
    client_id: &str,
    pin: Option<&str>,
    out: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = BootstrapToken::parse_hex(token)?;
    let client_id = ClientId::parse(client_id)?;
    let pinned = pin.map(parse_pin).transpose()?;

    let client = BootstrapClient::new(gateway);
    if client.join(&token, pinned.as_ref()).await? == JoinVerification::Unpinned {
        eprintln!("warning: no --pin given, gateway identity was not verified");
    }

    let keyring = client.auth(assertion, &client_id).await?;
    write_private(out, &keyring.to_json()?, false)?;

    println!("Tenant {} registered", client_id);
    for keys in keyring.shared_keys() {
        println!("Key ID: {}", keys.key_id());
    }
    println!("Keyring written to {}", out.display());

    Ok(())
}

fn parse_pin(hex_key: &str) -> Result<VerifyingKey, Box<dyn std::error::Error>> {
    let bytes = hex::decode(hex_key.trim())?;
    Ok(parse_public_key(&bytes)?)
}

/// Write a file readable only by the owner.
fn write_private(path: &Path, data: &[u8], overwrite: bool) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
