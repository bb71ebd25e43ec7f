//! Verwaltungsaufgaben fuer das Admin-Werkzeug
//!
//! Schluesselpaare erzeugen und Benutzer in die Whitelist eintragen.
//! Alle Funktionen arbeiten direkt auf den Dateien, die der Server beim
//! Start liest.

use anyhow::{Context, Result};
use hinterzimmer_auth::{credential_hashen, AuthError, CredentialStore};
use hinterzimmer_crypto::{key_files, AsymmetricKeyPair};
use std::path::Path;

/// Erzeugt ein RSA-Schluesselpaar und schreibt beide Haelften
pub fn schluessel_erzeugen(bits: usize, oeffentlich: &Path, privat: &Path) -> Result<()> {
    for pfad in [oeffentlich, privat] {
        verzeichnis_anlegen(pfad)?;
    }
    let paar = AsymmetricKeyPair::generieren(bits)?;
    key_files::schluesselpaar_schreiben(&paar, oeffentlich, privat)
        .context("Schluesselpaar konnte nicht geschrieben werden")?;
    tracing::info!(bits, "Schluesselpaar erzeugt");
    Ok(())
}

/// Traegt einen Benutzer in die Whitelist ein
///
/// Eine fehlende Whitelist-Datei wird angelegt. Ein bereits vorhandener
/// Benutzer wird nicht ueberschrieben.
pub fn whitelist_ergaenzen(pfad: &Path, benutzer: &str, passwort: &str) -> Result<()> {
    let store = if pfad.exists() {
        CredentialStore::laden(pfad)?
    } else {
        CredentialStore::neu()
    };

    match store.hinzufuegen(credential_hashen(benutzer), credential_hashen(passwort)) {
        Err(AuthError::BenutzerExistiert) => {
            anyhow::bail!("Benutzer '{benutzer}' steht bereits in der Whitelist")
        }
        ergebnis => ergebnis?,
    }

    verzeichnis_anlegen(pfad)?;
    store.speichern(pfad)?;
    tracing::info!(pfad = %pfad.display(), eintraege = store.anzahl(), "Whitelist gespeichert");
    Ok(())
}

fn verzeichnis_anlegen(pfad: &Path) -> Result<()> {
    if let Some(eltern) = pfad.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(eltern)
            .with_context(|| format!("Verzeichnis '{}' nicht anlegbar", eltern.display()))?;
    }
    Ok(())
}
