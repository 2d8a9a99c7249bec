//! Open Notion AI secret server - save, fetch and delete endpoints for the
//! encrypted Notion integration secret
//!
//! With `--in-memory` the server keeps everything in process and prints a
//! development bearer token on startup. `--print-schema` prints the table
//! migration for the hosted platform.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use secret_server::{
    AppState, MemoryPlatform, PlatformConfig, SecretServer, ServerConfig, ServerError,
};

/// Backend functions for the encrypted Notion secret
#[derive(Parser, Debug)]
#[command(name = "secret-server")]
#[command(version)]
#[command(about = "Stores encrypted Notion secrets for authenticated users")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8787")]
    port: u16,

    /// Front-end origin allowed by CORS ("*" allows any)
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = secret_server::config::PRODUCTION_ORIGIN)]
    allowed_origin: String,

    /// Base URL of the hosted platform
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Public API key of the hosted platform
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    supabase_anon_key: Option<String>,

    /// Service-role key, required for table access and account deletion
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    supabase_service_role_key: Option<String>,

    /// Keep users and secrets in process instead of using the hosted platform
    #[arg(long)]
    in_memory: bool,

    /// Print the SQL for the hosted secret table and exit
    #[arg(long)]
    print_schema: bool,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, ServerError> {
        let platform = if self.in_memory {
            PlatformConfig::InMemory
        } else {
            match (
                self.supabase_url,
                self.supabase_anon_key,
                self.supabase_service_role_key,
            ) {
                (Some(url), Some(anon_key), Some(service_role_key)) => PlatformConfig::Supabase {
                    url,
                    anon_key,
                    service_role_key,
                },
                _ => {
                    return Err(ServerError::Config(
                        "SUPABASE_URL, SUPABASE_ANON_KEY and SUPABASE_SERVICE_ROLE_KEY are required unless --in-memory is set".to_string(),
                    ))
                }
            }
        };

        Ok(ServerConfig {
            port: self.port,
            allowed_origin: Some(self.allowed_origin),
            platform,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_schema {
        print!("{}", secret_server::SCHEMA_SQL);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = args.into_config()?;
    let mut server = SecretServer::new(config.clone())?;

    if config.platform == PlatformConfig::InMemory {
        warn!("Running with the in-memory platform; all data is lost on exit");
        let platform = Arc::new(MemoryPlatform::new());
        let (token, user) = platform.issue_token().await;
        info!("Created development user {}", user);
        println!("Development bearer token: {}", token);
        server = server.with_state(AppState::from_platform(platform));
    }

    if config.allowed_origin.as_deref() == Some("*") {
        warn!("CORS allows any origin");
    }

    server.run().await?;

    Ok(())
}
