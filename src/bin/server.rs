//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Entry point for the marketplace API server. Loads configuration from the environment, sets up
// tracing, builds the password cipher and ledger store, and serves the API.
//--------------------------------------------------------------------------------------------------

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ticketbook::{Api, MemoryLedger, PasswordCipher};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticketbook=info,tower_http=info")),
        )
        .init();

    // Production points RSA_PRIVATE_KEY_PEM at a PKCS#8 PEM file; without one, a
    // fresh key pair is generated and stored passwords do not survive a restart.
    let cipher = match env::var("RSA_PRIVATE_KEY_PEM") {
        Ok(path) => {
            let pem = fs::read_to_string(&path)?;
            info!(path = %path, "loaded password key pair");
            PasswordCipher::from_pem(&pem)?
        }
        Err(_) => {
            warn!("RSA_PRIVATE_KEY_PEM not set, generating an ephemeral key pair");
            PasswordCipher::generate()?
        }
    };

    let port: u16 = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(5555);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let store = Arc::new(MemoryLedger::new());
    Api::new(addr, store, cipher).serve().await?;

    Ok(())
}
