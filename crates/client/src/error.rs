//! Fehlertypen fuer den Chat-Client

use hinterzimmer_crypto::CryptoError;
use thiserror::Error;

/// Fehler die bei der Server-Verbindung auftreten koennen
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP-Verbindung fehlgeschlagen
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Ver- oder Entschluesselung fehlgeschlagen
    #[error("Krypto-Fehler: {0}")]
    Crypto(#[from] CryptoError),

    /// Unerwartete Antwort vom Server
    #[error("Unerwartete Antwort: {0}")]
    UnerwarteteAntwort(String),

    /// Server hat die Verbindung getrennt
    #[error("Verbindung vom Server getrennt")]
    VerbindungGetrennt,
}

/// Result-Typ fuer den Chat-Client
pub type ClientResult<T> = Result<T, ClientError>;
