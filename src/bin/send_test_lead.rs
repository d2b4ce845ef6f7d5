//! Sends a sample lead through every configured notification channel and
//! prints what happened. Useful when setting up CallMeBot or SMTP credentials.
//!
//! Usage: `cargo run --bin send_test_lead [--whatsapp-only]`

use beylerbeyi_leads::config::Config;
use beylerbeyi_leads::handlers::{sample_lead, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beylerbeyi_leads=info".into()),
        )
        .init();

    let whatsapp_only = std::env::args().any(|a| a == "--whatsapp-only");

    let config = Config::from_env()?;
    let state = AppState::from_config(config).await?;
    let lead = sample_lead()?;

    println!("🧪 Sending test lead {}", lead.reference());
    println!(
        "   WhatsApp destination: {}",
        state.dispatcher.whatsapp().destination()
    );
    println!(
        "   Channels: {}",
        state.dispatcher.whatsapp().channel_names().join(" → ")
    );
    println!();

    let whatsapp = if whatsapp_only {
        let report = state.dispatcher.dispatch_whatsapp(&lead).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        report
    } else {
        let report = state.dispatcher.dispatch(&lead).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        report.whatsapp
    };

    match whatsapp.delivered_by() {
        Some("manual_link") | None => {}
        Some(channel) => println!("\n✓ Delivered automatically via {}", channel),
    }
    if let Some(link) = whatsapp.manual_link() {
        println!("\n📱 Open this link to send the lead manually:");
        println!("{}", link);
    }

    Ok(())
}
