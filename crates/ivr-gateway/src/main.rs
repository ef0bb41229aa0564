//! ivr-gateway: voice-call webhook service
//!
//! Usage:
//!   ivr-gateway                    - Serve Twilio webhooks (default)
//!   ivr-gateway check-config       - Report configuration problems
//!   ivr-gateway setup-number       - Buy a number and point it at this service
//!   ivr-gateway verify-numbers     - Check owned numbers' webhook URLs
//!   ivr-gateway test-webhooks URL  - Smoke-test a running deployment

mod tools;

use clap::{Parser, Subcommand};
use ivr_core::Config;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ivr-gateway", version, about = "Twilio voice webhook gateway")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve webhooks until Ctrl+C
    Serve,
    /// Print the configuration report; exits 1 when something is missing
    CheckConfig,
    /// Search local numbers, buy one and configure its webhooks
    SetupNumber {
        /// ISO country code to search in
        #[arg(long, default_value = "US")]
        country: String,
        /// Restrict the search to an area code
        #[arg(long)]
        area_code: Option<u16>,
        /// Which search result to buy, starting at 1
        #[arg(long, default_value_t = 1)]
        pick: usize,
    },
    /// List owned numbers and compare their webhooks with this deployment
    VerifyNumbers,
    /// Exercise /health, /test_tts and /voice on a running deployment
    TestWebhooks {
        /// Base URL; defaults to WEBHOOK_BASE_URL
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::CheckConfig => {
            if !tools::check_config(&config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::SetupNumber {
            country,
            area_code,
            pick,
        } => tools::setup_number(&config, country, area_code, pick).await,
        Command::VerifyNumbers => tools::verify_numbers(&config).await,
        Command::TestWebhooks { url } => {
            let base = url
                .or_else(|| config.server.webhook_base_url.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!("No URL given and WEBHOOK_BASE_URL is not set")
                })?;
            if !tools::test_webhooks(&base).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

/// Run the webhook server until Ctrl+C
async fn run_server(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting ivr-gateway...");
    tracing::info!("Business: {}", config.business.name);

    if config.is_demo_mode() {
        tracing::warn!("Running in demo mode (TWILIO_ACCOUNT_SID not set)");
    }
    if config.signature_check_unusable() {
        tracing::warn!(
            "VALIDATE_SIGNATURES is on but TWILIO_AUTH_TOKEN is not set; every webhook will be rejected with 403"
        );
    }
    match config.operator_phone() {
        Some(phone) => tracing::info!("Transfers go to {}", phone),
        None => tracing::warn!("OWNER_PHONE not set; transfer requests will end the call"),
    }
    match config.webhook_url("/voice") {
        Some(url) => tracing::info!("Voice webhook: {}", url),
        None => tracing::info!("WEBHOOK_BASE_URL not set; using relative callback URLs"),
    }

    tracing::info!("Press Ctrl+C to exit");

    ivr_webhook::start_server(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        tracing::info!("Shutting down...");
    })
    .await?;

    tracing::info!("ivr-gateway stopped");
    Ok(())
}
