//! Hashing von Anmeldedaten mit SHA-256
//!
//! Der Client hasht Benutzername und Passwort, bevor sie das Geraet
//! verlassen. Der Server sieht und speichert nur die Hex-Digests.

use hinterzimmer_core::CredentialHash;
use sha2::{Digest, Sha256};

/// Hasht einen Klartext (UTF-8) zu einem hex-kodierten SHA-256-Digest
pub fn credential_hashen(klartext: &str) -> CredentialHash {
    let digest: [u8; 32] = Sha256::digest(klartext.as_bytes()).into();
    CredentialHash::aus_digest(&digest)
}
