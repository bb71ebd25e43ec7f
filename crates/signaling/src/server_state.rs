//! Gemeinsamer Server-Zustand fuer den Relay-Service
//!
//! Haelt Whitelist, Server-Schluessel, Sitzungsschluessel und Registry.
//! Alles ausser der Registry ist nach dem Start unveraenderlich.

use hinterzimmer_auth::CredentialStore;
use hinterzimmer_crypto::{key_files, AsymmetricKeyPair, SessionKey};
use hinterzimmer_protocol::wire::DEFAULT_MAX_FRAME_SIZE;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::error::{SignalingError, SignalingResult};
use crate::registry::{SessionRegistry, STANDARD_QUEUE_GROESSE};

/// Laufzeit-Konfiguration fuer Verbindungen
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Timeout fuer den ersten Frame in Sekunden (0 = kein Timeout)
    pub handshake_timeout_sek: u64,
    /// Maximale Frame-Laenge in Bytes
    pub max_frame_laenge: usize,
    /// Groesse der Send-Queue pro Mitglied
    pub sende_queue_groesse: usize,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_mitglieder: usize,
}

impl SignalingConfig {
    /// Handshake-Timeout, `None` wenn deaktiviert
    pub fn handshake_timeout(&self) -> Option<Duration> {
        (self.handshake_timeout_sek > 0).then(|| Duration::from_secs(self.handshake_timeout_sek))
    }

    /// Prueft die Grenzwerte vor dem Start
    pub fn pruefen(&self) -> SignalingResult<()> {
        if !(1..=Semaphore::MAX_PERMITS).contains(&self.max_mitglieder) {
            return Err(SignalingError::Konfiguration(format!(
                "max_mitglieder muss zwischen 1 und {} liegen, ist {}",
                Semaphore::MAX_PERMITS,
                self.max_mitglieder
            )));
        }
        if self.max_frame_laenge == 0 {
            return Err(SignalingError::Konfiguration(
                "max_frame_laenge muss groesser als 0 sein".into(),
            ));
        }
        if self.sende_queue_groesse == 0 {
            return Err(SignalingError::Konfiguration(
                "sende_queue_groesse muss groesser als 0 sein".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_sek: 30,
            max_frame_laenge: DEFAULT_MAX_FRAME_SIZE,
            sende_queue_groesse: STANDARD_QUEUE_GROESSE,
            max_mitglieder: 256,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Verbindungs-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Whitelist der zugelassenen Anmeldedaten
    pub whitelist: Arc<CredentialStore>,
    /// RSA-Schluesselpaar des Servers
    pub server_schluessel: AsymmetricKeyPair,
    /// Sitzungsschluessel dieses Laufs, identisch fuer alle Mitglieder
    pub session_key: SessionKey,
    /// Hub aller zugelassenen Mitglieder
    pub registry: SessionRegistry,
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState
    pub fn neu(
        config: SignalingConfig,
        whitelist: Arc<CredentialStore>,
        server_schluessel: AsymmetricKeyPair,
        session_key: SessionKey,
    ) -> Arc<Self> {
        let registry = SessionRegistry::mit_queue_groesse(config.sende_queue_groesse);
        Arc::new(Self {
            config: Arc::new(config),
            whitelist,
            server_schluessel,
            session_key,
            registry,
        })
    }

    /// Laedt Whitelist und privaten Server-Schluessel und erzeugt einen
    /// frischen Sitzungsschluessel
    ///
    /// Jeder Fehler hier ist ein Ladefehler; der Server darf dann nicht starten.
    pub fn laden(
        config: SignalingConfig,
        whitelist_pfad: impl AsRef<Path>,
        server_privat_pfad: impl AsRef<Path>,
    ) -> SignalingResult<Arc<Self>> {
        config.pruefen()?;
        let whitelist = CredentialStore::laden(whitelist_pfad)?;
        let server_schluessel = key_files::schluesselpaar_lesen(server_privat_pfad)?;
        let session_key = SessionKey::generieren()?;
        Ok(Self::neu(
            config,
            Arc::new(whitelist),
            server_schluessel,
            session_key,
        ))
    }
}

impl std::fmt::Debug for SignalingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalingState")
            .field("config", &self.config)
            .field("whitelist_eintraege", &self.whitelist.anzahl())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_gueltig() {
        assert!(SignalingConfig::default().pruefen().is_ok());
    }

    #[test]
    fn max_mitglieder_ausserhalb_der_grenzen() {
        for max_mitglieder in [0, Semaphore::MAX_PERMITS + 1] {
            let config = SignalingConfig {
                max_mitglieder,
                ..SignalingConfig::default()
            };
            assert!(matches!(
                config.pruefen(),
                Err(SignalingError::Konfiguration(_))
            ));
        }
    }

    #[test]
    fn leere_queue_oder_frame_laenge() {
        let queue = SignalingConfig {
            sende_queue_groesse: 0,
            ..SignalingConfig::default()
        };
        assert!(queue.pruefen().is_err());

        let frame = SignalingConfig {
            max_frame_laenge: 0,
            ..SignalingConfig::default()
        };
        assert!(frame.pruefen().is_err());
    }
}
