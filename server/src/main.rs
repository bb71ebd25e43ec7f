//! Hinterzimmer Server – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Server.

use anyhow::Result;
use hinterzimmer_server::config::{ServerConfig, ENV_CONFIG, STANDARD_CONFIG_PFAD};
use hinterzimmer_server::Server;

#[tokio::main]
async fn main() -> Result<()> {
    // Konfigurationsdatei-Pfad aus Umgebungsvariable oder Standard
    let config_pfad = std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_CONFIG_PFAD.into());

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ServerConfig::laden(&config_pfad)?;

    hinterzimmer_observability::logging_initialisieren(
        &config.logging.level,
        &config.logging.format,
    )?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        "Hinterzimmer Server wird initialisiert"
    );

    Server::neu(config).starten().await
}
