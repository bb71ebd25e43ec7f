//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `HZ_LOG_LEVEL`: Filter (trace/debug/info/warn/error oder EnvFilter-Syntax)
//! - `HZ_LOG_FORMAT`: Format (text/json)
//!
//! Umgebungsvariablen haben Vorrang vor den uebergebenen Werten.
//! Logs gehen auf stderr, damit stdout fuer Programmausgaben frei bleibt.

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "HZ_LOG_LEVEL";

/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "HZ_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parst `text` oder `json` (exakt, Kleinschreibung)
    pub fn parse(format: &str) -> Option<Self> {
        match format {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Initialisiert das Logging-System.
///
/// Ein ungueltiges Format faellt auf `text` zurueck, ein ungueltiger
/// Filter auf `info`. Schlaegt nur fehl wenn bereits ein globaler
/// Subscriber gesetzt ist.
pub fn logging_initialisieren(level: &str, format: &str) -> anyhow::Result<()> {
    let level = wert_aufloesen(std::env::var(ENV_LOG_LEVEL).ok(), level);
    let format = wert_aufloesen(std::env::var(ENV_LOG_FORMAT).ok(), format);

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let format = LogFormat::parse(&format).unwrap_or_default();

    let ergebnis = match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    ergebnis.map_err(|e| anyhow::anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}

/// Wert aus der Umgebung, sonst der konfigurierte Wert
fn wert_aufloesen(aus_env: Option<String>, konfiguriert: &str) -> String {
    aus_env
        .filter(|wert| !wert.trim().is_empty())
        .unwrap_or_else(|| konfiguriert.to_string())
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}
