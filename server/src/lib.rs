//! hinterzimmer-server – Bibliotheks-Root
//!
//! Deklariert alle Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod admin;
pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use hinterzimmer_crypto::key_files;
use hinterzimmer_signaling::{RelayServer, SignalingState};
use std::sync::Arc;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Laedt Whitelist und Server-Schluessel und erzeugt den Sitzungsschluessel
    ///
    /// Jeder Fehler hier verhindert den Start. Sind Pfade fuer den
    /// Sitzungsschluessel konfiguriert, wird er dorthin geschrieben.
    pub fn zustand_laden(&self) -> Result<Arc<SignalingState>> {
        let schluessel = &self.config.schluessel;
        let state = SignalingState::laden(
            self.config.signaling_config()?,
            &schluessel.whitelist,
            &schluessel.server_privat,
        )
        .with_context(|| {
            format!(
                "Whitelist '{}' oder Server-Schluessel '{}' nicht ladbar",
                schluessel.whitelist.display(),
                schluessel.server_privat.display()
            )
        })?;

        match (&schluessel.sitzung_schluessel, &schluessel.sitzung_iv) {
            (Some(schluessel_pfad), Some(iv_pfad)) => {
                key_files::session_key_schreiben(&state.session_key, schluessel_pfad, iv_pfad)
                    .context("Sitzungsschluessel konnte nicht gespeichert werden")?;
                tracing::info!(
                    schluessel = %schluessel_pfad.display(),
                    iv = %iv_pfad.display(),
                    "Sitzungsschluessel gespeichert"
                );
            }
            (None, None) => {}
            _ => tracing::warn!(
                "Nur einer von sitzung_schluessel/sitzung_iv gesetzt, Sitzungsschluessel wird nicht gespeichert"
            ),
        }

        tracing::info!(
            whitelist_eintraege = state.whitelist.anzahl(),
            "Server-Zustand geladen"
        );
        Ok(state)
    }

    /// Startet den Relay-Server und laeuft bis zum Shutdown-Signal (Ctrl-C)
    ///
    /// Reihenfolge:
    /// 1. Whitelist und Schluessel laden (Abbruch bei Fehler)
    /// 2. TCP-Listener binden
    /// 3. Verbindungen annehmen bis Ctrl-C
    pub async fn starten(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler nicht installierbar"),
            }
        });
        self.laufen(shutdown_rx).await
    }

    /// Wie `starten`, aber mit einem eigenen Shutdown-Signal
    pub async fn laufen(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let state = self.zustand_laden()?;
        let adresse = self.config.tcp_bind_adresse()?;

        let server = RelayServer::binden(state, adresse)
            .await
            .with_context(|| format!("TCP-Listener auf {adresse} nicht bindbar"))?;
        server.starten(shutdown_rx).await?;
        Ok(())
    }
}
