//! Gemeinsame Identifikationstypen fuer Hinterzimmer
//!
//! IDs verwenden das Newtype-Pattern, damit Mitglieds-IDs und Hashes nicht
//! mit beliebigen Strings verwechselt werden koennen.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Laenge eines hex-kodierten SHA-256-Digests
pub const HASH_HEX_LAENGE: usize = 64;

/// Eindeutige ID einer zugelassenen Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub Uuid);

impl MemberId {
    /// Erstellt eine neue zufaellige MemberId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "member:{}", self.0)
    }
}

/// Fehler beim Parsen eines Credential-Hashes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ungueltiger Hash: {0}")]
pub struct UngueltigerHash(pub String);

/// Hex-kodierter SHA-256-Digest eines Benutzernamens oder Passworts
///
/// Immer genau 64 Zeichen, Kleinbuchstaben. Gleichheit ist exakter
/// Vergleich der Digests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Parst einen hex-kodierten Digest
    ///
    /// Grossbuchstaben werden normalisiert, damit Whitelist-Eintraege
    /// unabhaengig vom Werkzeug, das sie erzeugt hat, vergleichbar bleiben.
    pub fn parse(hex: &str) -> Result<Self, UngueltigerHash> {
        if hex.len() != HASH_HEX_LAENGE {
            return Err(UngueltigerHash(format!(
                "erwartet {HASH_HEX_LAENGE} Zeichen, erhalten {}",
                hex.len()
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UngueltigerHash("enthaelt Nicht-Hex-Zeichen".into()));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Kodiert einen rohen SHA-256-Digest
    pub fn aus_digest(digest: &[u8; HASH_HEX_LAENGE / 2]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CredentialHash {
    type Error = UngueltigerHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CredentialHash> for String {
    fn from(hash: CredentialHash) -> Self {
        hash.0
    }
}

impl std::fmt::Display for CredentialHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEISPIEL: &str = "2bd806c97f0e00af1a1fc3328fa763a9269723c8db8fac4f93af71db186d6e90";

    #[test]
    fn member_ids_sind_eindeutig() {
        assert_ne!(MemberId::new(), MemberId::new());
    }

    #[test]
    fn hash_parse_akzeptiert_64_hex_zeichen() {
        let hash = CredentialHash::parse(BEISPIEL).unwrap();
        assert_eq!(hash.as_str(), BEISPIEL);
    }

    #[test]
    fn hash_parse_normalisiert_grossbuchstaben() {
        let hash = CredentialHash::parse(&BEISPIEL.to_ascii_uppercase()).unwrap();
        assert_eq!(hash.as_str(), BEISPIEL);
    }

    #[test]
    fn hash_parse_lehnt_falsche_laenge_ab() {
        let fehler = CredentialHash::parse("abcd").unwrap_err();
        assert_eq!(
            fehler.to_string(),
            "ungueltiger Hash: erwartet 64 Zeichen, erhalten 4"
        );
        assert!(CredentialHash::parse("").is_err());
    }

    #[test]
    fn hash_parse_lehnt_nicht_hex_ab() {
        let kaputt = format!("{}zz", &BEISPIEL[..62]);
        assert!(CredentialHash::parse(&kaputt).is_err());
    }
}
