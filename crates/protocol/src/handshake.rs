//! Handshake-Frames und reservierte Klartexte
//!
//! Der Handshake besteht aus genau einem Frame pro Richtung:
//!
//! 1. Client -> Server: `"<anmeldedaten-chiffrat> <client-public-key>"`
//!    Das Chiffrat ist mit dem oeffentlichen Server-Schluessel verschluesselt
//!    und enthaelt `"<benutzer-hash> <passwort-hash>"`.
//! 2. Server -> Client: ein mit dem Client-Schluessel verschluesselter Text,
//!    entweder `ABLEHNUNGS_MARKER` oder `"<base64-schluessel> <base64-iv>"`.
//!
//! Dieses Modul kennt nur die Textform. Ver- und Entschluesselung
//! uebernimmt der Aufrufer.

use hinterzimmer_core::CredentialHash;
use thiserror::Error;

/// Klartext der Antwort bei ungueltigen Anmeldedaten
pub const ABLEHNUNGS_MARKER: &str = "N";

/// Klartext, mit dem ein Client die Sitzung absichtlich verlaesst
pub const TRENN_SENTINEL: &str = "--stop connection--";

/// Fehler beim Parsen von Handshake-Frames
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Ungueltiger Handshake-Frame: {0}")]
    UngueltigerHandshake(String),

    #[error("Ungueltige Anmeldedaten-Nutzlast: {0}")]
    UngueltigeAnmeldedaten(String),
}

/// Teilt einen Text in genau zwei durch ein Leerzeichen getrennte Teile
fn zwei_teile(text: &str) -> Option<(&str, &str)> {
    let (links, rechts) = text.split_once(' ')?;
    if links.is_empty() || rechts.is_empty() || rechts.contains(' ') {
        return None;
    }
    Some((links, rechts))
}

// ---------------------------------------------------------------------------
// HandshakeRequest
// ---------------------------------------------------------------------------

/// Erster Frame eines Clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// RSA-Chiffrat der Anmeldedaten (hex)
    pub anmeldedaten_chiffrat: String,
    /// Oeffentlicher Schluessel des Clients (Base64 DER)
    pub client_public_key: String,
}

impl HandshakeRequest {
    /// Parst einen Handshake-Frame
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let (chiffrat, public_key) = zwei_teile(frame.trim()).ok_or_else(|| {
            ProtocolError::UngueltigerHandshake(
                "erwartet '<anmeldedaten> <public-key>'".into(),
            )
        })?;
        Ok(Self {
            anmeldedaten_chiffrat: chiffrat.to_string(),
            client_public_key: public_key.to_string(),
        })
    }

    /// Textform fuer den Versand
    pub fn to_frame(&self) -> String {
        format!("{} {}", self.anmeldedaten_chiffrat, self.client_public_key)
    }
}

// ---------------------------------------------------------------------------
// Anmeldedaten
// ---------------------------------------------------------------------------

/// Entschluesselte Anmeldedaten (nur Hashes, nie Klartext)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anmeldedaten {
    pub benutzer: CredentialHash,
    pub passwort: CredentialHash,
}

impl Anmeldedaten {
    pub fn neu(benutzer: CredentialHash, passwort: CredentialHash) -> Self {
        Self { benutzer, passwort }
    }

    /// Parst `"<benutzer-hash> <passwort-hash>"`
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let (benutzer, passwort) = zwei_teile(text.trim()).ok_or_else(|| {
            ProtocolError::UngueltigeAnmeldedaten("erwartet '<benutzer> <passwort>'".into())
        })?;
        let parse = |hash: &str| {
            CredentialHash::parse(hash)
                .map_err(|e| ProtocolError::UngueltigeAnmeldedaten(e.to_string()))
        };
        Ok(Self {
            benutzer: parse(benutzer)?,
            passwort: parse(passwort)?,
        })
    }

    /// Klartext fuer die RSA-Verschluesselung
    pub fn to_klartext(&self) -> String {
        format!("{} {}", self.benutzer, self.passwort)
    }
}

// ---------------------------------------------------------------------------
// HandshakeAntwort
// ---------------------------------------------------------------------------

/// Entschluesselte Antwort des Servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeAntwort {
    /// Anmeldedaten ungueltig, Verbindung wird geschlossen
    Abgelehnt,
    /// Zugelassen; enthaelt die kodierte Sitzungsschluessel-Nutzlast
    Zugelassen(String),
}

impl HandshakeAntwort {
    /// Interpretiert den entschluesselten Antworttext
    pub fn aus_klartext(text: &str) -> Self {
        let text = text.trim();
        if text == ABLEHNUNGS_MARKER {
            Self::Abgelehnt
        } else {
            Self::Zugelassen(text.to_string())
        }
    }

    /// Klartext vor der RSA-Verschluesselung
    pub fn to_klartext(&self) -> &str {
        match self {
            Self::Abgelehnt => ABLEHNUNGS_MARKER,
            Self::Zugelassen(nutzlast) => nutzlast,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
