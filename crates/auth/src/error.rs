//! Fehlertypen fuer Whitelist und Anmeldedaten

use std::path::PathBuf;
use thiserror::Error;

/// Alle moeglichen Fehler im Auth-Crate
#[derive(Debug, Error)]
pub enum AuthError {
    // --- Laden ---
    #[error("Whitelist '{pfad}' nicht lesbar: {quelle}")]
    WhitelistNichtLesbar {
        pfad: PathBuf,
        #[source]
        quelle: std::io::Error,
    },

    #[error("Whitelist fehlerhaft in Zeile {zeile}: {grund}")]
    WhitelistFehlerhaft { zeile: usize, grund: String },

    // --- Administration ---
    #[error("Benutzer existiert bereits")]
    BenutzerExistiert,

    #[error("Whitelist konnte nicht geschrieben werden: {0}")]
    Speichern(#[from] std::io::Error),
}

impl AuthError {
    /// Gehoert der Fehler zu den Ladefehlern beim Start?
    pub fn ist_ladefehler(&self) -> bool {
        matches!(
            self,
            Self::WhitelistNichtLesbar { .. } | Self::WhitelistFehlerhaft { .. }
        )
    }
}

/// Result-Alias fuer das Auth-Crate
pub type AuthResult<T> = Result<T, AuthError>;
