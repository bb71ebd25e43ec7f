//! Fehlertypen fuer das Kryptografie-Subsystem

use thiserror::Error;

/// Fehler im Kryptografie-Subsystem
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Schluessel-Generierung fehlgeschlagen: {0}")]
    SchluesselGenerierung(String),

    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Nutzlast zu gross: maximal {max} Bytes, erhalten {erhalten}")]
    NutzlastZuGross { max: usize, erhalten: usize },

    #[error("Ungueltige Schluessel-Laenge: {erhalten} Bytes")]
    UngueltigeSchluesselLaenge { erhalten: usize },

    #[error("Ungueltige IV-Laenge: erwartet {erwartet}, erhalten {erhalten}")]
    UngueltigeIvLaenge { erwartet: usize, erhalten: usize },

    #[error("Schluessel-Kodierung fehlgeschlagen: {0}")]
    SchluesselKodierung(String),

    #[error("Ungueltige Daten: {0}")]
    UngueltigeDaten(String),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Hex-Dekodierung fehlgeschlagen: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

pub type CryptoResult<T> = Result<T, CryptoError>;
