//! Fehlertypen fuer den Relay-Service

use hinterzimmer_auth::AuthError;
use hinterzimmer_crypto::CryptoError;
use hinterzimmer_protocol::ProtocolError;
use thiserror::Error;

/// Fehlertyp fuer den Relay-Service
///
/// Fehler einer Verbindung schliessen nur diese Verbindung.
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Ver- oder Entschluesselung fehlgeschlagen
    #[error("Krypto-Fehler: {0}")]
    Crypto(#[from] CryptoError),

    /// Whitelist konnte nicht geladen werden
    #[error("Whitelist-Fehler: {0}")]
    Auth(#[from] AuthError),

    /// Verbindung wurde vor Ende des Handshakes getrennt
    #[error("Verbindung getrennt")]
    VerbindungGetrennt,

    /// Protokollfehler (ungueltiger Handshake-Frame)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Handshake nicht rechtzeitig abgeschlossen
    #[error("Timeout")]
    Timeout,

    /// Ungueltige Laufzeit-Konfiguration
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl From<ProtocolError> for SignalingError {
    fn from(e: ProtocolError) -> Self {
        Self::Protokoll(e.to_string())
    }
}

/// Result-Typ fuer den Relay-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
