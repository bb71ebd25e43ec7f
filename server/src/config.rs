//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist, sofern Whitelist und Schluessel am Standardort liegen.

use anyhow::Context;
use hinterzimmer_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Umgebungsvariable mit dem Pfad der Konfigurationsdatei
pub const ENV_CONFIG: &str = "HZ_CONFIG";

/// Standard-Pfad der Konfigurationsdatei
pub const STANDARD_CONFIG_PFAD: &str = "hinterzimmer.toml";

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Verbindungs- und Sitzungs-Einstellungen
    pub sitzung: SitzungsEinstellungen,
    /// Pfade zu Whitelist und Schluesselmaterial
    pub schluessel: SchluesselEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den TCP-Listener
    pub bind_adresse: String,
    /// Port fuer den TCP-Listener
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 12000,
        }
    }
}

/// Verbindungs- und Sitzungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungsEinstellungen {
    /// Timeout fuer den Handshake-Frame in Sekunden (0 = kein Timeout)
    pub handshake_timeout_sek: u64,
    /// Maximale Frame-Laenge in Bytes
    pub max_frame_laenge: usize,
    /// Send-Queue pro Mitglied; wer sie fuellt, wird getrennt
    pub sende_queue_groesse: usize,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_mitglieder: usize,
}

impl Default for SitzungsEinstellungen {
    fn default() -> Self {
        let standard = SignalingConfig::default();
        Self {
            handshake_timeout_sek: standard.handshake_timeout_sek,
            max_frame_laenge: standard.max_frame_laenge,
            sende_queue_groesse: standard.sende_queue_groesse,
            max_mitglieder: standard.max_mitglieder,
        }
    }
}

/// Pfade zu Whitelist und Schluesselmaterial
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchluesselEinstellungen {
    /// Privater RSA-Schluessel des Servers (PKCS#8 DER)
    pub server_privat: PathBuf,
    /// Whitelist-Datei
    pub whitelist: PathBuf,
    /// Optional: Sitzungsschluessel nach dem Start hierhin schreiben
    pub sitzung_schluessel: Option<PathBuf>,
    /// Optional: IV des Sitzungsschluessels hierhin schreiben
    pub sitzung_iv: Option<PathBuf>,
}

impl Default for SchluesselEinstellungen {
    fn default() -> Self {
        Self {
            server_privat: "ServerDocuments/server_private.key".into(),
            whitelist: "Documents/whitelist.txt".into(),
            sitzung_schluessel: None,
            sitzung_iv: None,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port);
        adresse
            .parse()
            .with_context(|| format!("Ungueltige Bind-Adresse '{adresse}'"))
    }

    /// Laufzeit-Konfiguration fuer den Relay-Service
    ///
    /// Schlaegt fehl wenn ein Wert in `[sitzung]` ausserhalb seiner Grenzen liegt.
    pub fn signaling_config(&self) -> anyhow::Result<SignalingConfig> {
        let config = SignalingConfig {
            handshake_timeout_sek: self.sitzung.handshake_timeout_sek,
            max_frame_laenge: self.sitzung.max_frame_laenge,
            sende_queue_groesse: self.sitzung.sende_queue_groesse,
            max_mitglieder: self.sitzung.max_mitglieder,
        };
        config.pruefen().context("Ungueltige [sitzung]-Einstellungen")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.netzwerk.tcp_port, 12000);
        assert_eq!(cfg.sitzung.handshake_timeout_sek, 30);
        assert_eq!(cfg.sitzung.max_frame_laenge, 64 * 1024);
        assert_eq!(cfg.schluessel.whitelist, PathBuf::from("Documents/whitelist.txt"));
        assert!(cfg.schluessel.sitzung_schluessel.is_none());
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(
            cfg.tcp_bind_adresse().unwrap(),
            "0.0.0.0:12000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn ungueltige_bind_adresse() {
        let mut cfg = ServerConfig::default();
        cfg.netzwerk.bind_adresse = "kein host".into();
        assert!(cfg.tcp_bind_adresse().is_err());
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            tcp_port = 13000

            [sitzung]
            handshake_timeout_sek = 0
            max_mitglieder = 8

            [schluessel]
            whitelist = "/etc/hinterzimmer/whitelist.txt"
            sitzung_schluessel = "secret_key"
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.netzwerk.tcp_port, 13000);
        assert_eq!(cfg.sitzung.max_mitglieder, 8);
        assert_eq!(
            cfg.schluessel.sitzung_schluessel,
            Some(PathBuf::from("secret_key"))
        );
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
        assert_eq!(cfg.sitzung.sende_queue_groesse, 256);

        let signaling = cfg.signaling_config().unwrap();
        assert_eq!(signaling.handshake_timeout(), None);
        assert_eq!(signaling.max_mitglieder, 8);
    }

    #[test]
    fn max_mitglieder_wird_geprueft() {
        let null: ServerConfig = toml::from_str("[sitzung]\nmax_mitglieder = 0").unwrap();
        assert!(null.signaling_config().is_err());

        let riesig: ServerConfig =
            toml::from_str(&format!("[sitzung]\nmax_mitglieder = {}", i64::MAX)).unwrap();
        assert!(riesig.signaling_config().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("gibt-es-nicht.toml");
        let cfg = ServerConfig::laden(pfad.to_str().unwrap()).unwrap();
        assert_eq!(cfg.netzwerk.tcp_port, 12000);
    }

    #[test]
    fn kaputte_datei_ist_fehler() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("kaputt.toml");
        std::fs::write(&pfad, "[netzwerk\ntcp_port = ").unwrap();
        assert!(ServerConfig::laden(pfad.to_str().unwrap()).is_err());
    }
}
