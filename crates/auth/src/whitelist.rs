//! CredentialStore – die Whitelist zugelassener Mitglieder
//!
//! Zuordnung Benutzer-Hash -> Passwort-Hash. Wird beim Serverstart einmal
//! geladen und ist danach nur ueber `hinzufuegen` veraenderbar. Gleichzeitige
//! Pruefungen sehen die Eintraege immer entweder vor oder nach einer
//! Aenderung, nie einen Zwischenstand.
//!
//! ## Dateiformat
//!
//! ```text
//! <benutzer-hash> <passwort-hash>
//! <benutzer-hash> <passwort-hash>
//! ```
//!
//! Leere Zeilen werden ignoriert.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use hinterzimmer_core::CredentialHash;
use parking_lot::RwLock;

use crate::error::{AuthError, AuthResult};

/// Whitelist aller zugelassenen Anmeldedaten
#[derive(Debug, Default)]
pub struct CredentialStore {
    eintraege: RwLock<HashMap<CredentialHash, CredentialHash>>,
}

impl CredentialStore {
    /// Erstellt eine leere Whitelist
    pub fn neu() -> Self {
        Self::default()
    }

    /// Laedt die Whitelist aus einer Datei
    pub fn laden(pfad: impl AsRef<Path>) -> AuthResult<Self> {
        let pfad = pfad.as_ref();
        let inhalt = fs::read_to_string(pfad).map_err(|quelle| AuthError::WhitelistNichtLesbar {
            pfad: pfad.to_path_buf(),
            quelle,
        })?;
        let store = Self::aus_text(&inhalt)?;
        tracing::info!(
            pfad = %pfad.display(),
            eintraege = store.anzahl(),
            "Whitelist geladen"
        );
        Ok(store)
    }

    /// Parst den Inhalt einer Whitelist-Datei
    pub fn aus_text(inhalt: &str) -> AuthResult<Self> {
        let mut eintraege = HashMap::new();

        for (index, zeile) in inhalt.lines().enumerate() {
            let zeile_nr = index + 1;
            let zeile = zeile.trim();
            if zeile.is_empty() {
                continue;
            }

            let mut felder = zeile.split_whitespace();
            let (Some(benutzer), Some(passwort), None) = (felder.next(), felder.next(), felder.next())
            else {
                return Err(AuthError::WhitelistFehlerhaft {
                    zeile: zeile_nr,
                    grund: "erwartet '<benutzer-hash> <passwort-hash>'".into(),
                });
            };

            let parse = |hash: &str| {
                CredentialHash::parse(hash).map_err(|e| AuthError::WhitelistFehlerhaft {
                    zeile: zeile_nr,
                    grund: e.to_string(),
                })
            };
            let benutzer = parse(benutzer)?;
            let passwort = parse(passwort)?;

            if eintraege.insert(benutzer, passwort).is_some() {
                tracing::warn!(zeile = zeile_nr, "Doppelter Benutzer in Whitelist, letzter Eintrag gilt");
            }
        }

        Ok(Self {
            eintraege: RwLock::new(eintraege),
        })
    }

    /// Prueft ob das Paar aus Benutzer- und Passwort-Hash zugelassen ist
    pub fn ist_gueltig(&self, benutzer: &CredentialHash, passwort: &CredentialHash) -> bool {
        self.eintraege
            .read()
            .get(benutzer)
            .is_some_and(|gespeichert| gespeichert == passwort)
    }

    /// Fuegt einen neuen Benutzer hinzu
    ///
    /// Ein bereits vorhandener Benutzer-Hash wird nicht ueberschrieben.
    pub fn hinzufuegen(&self, benutzer: CredentialHash, passwort: CredentialHash) -> AuthResult<()> {
        let mut eintraege = self.eintraege.write();
        if eintraege.contains_key(&benutzer) {
            return Err(AuthError::BenutzerExistiert);
        }
        eintraege.insert(benutzer, passwort);
        Ok(())
    }

    /// Schreibt die Whitelist im Dateiformat (sortiert)
    pub fn speichern(&self, pfad: impl AsRef<Path>) -> AuthResult<()> {
        fs::write(pfad.as_ref(), self.zu_text())?;
        Ok(())
    }

    /// Textform der Whitelist, ein Eintrag pro Zeile
    pub fn zu_text(&self) -> String {
        let eintraege = self.eintraege.read();
        let mut zeilen: Vec<String> = eintraege
            .iter()
            .map(|(benutzer, passwort)| format!("{benutzer} {passwort}\n"))
            .collect();
        zeilen.sort();
        zeilen.concat()
    }

    /// Anzahl der Eintraege
    pub fn anzahl(&self) -> usize {
        self.eintraege.read().len()
    }

    pub fn ist_leer(&self) -> bool {
        self.anzahl() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::credential_hashen;
    use std::sync::Arc;

    fn alice_zeile() -> String {
        format!(
            "{} {}\n",
            credential_hashen("alice"),
            credential_hashen("secret")
        )
    }

    #[test]
    fn gueltige_anmeldedaten() {
        let store = CredentialStore::aus_text(&alice_zeile()).unwrap();
        assert!(store.ist_gueltig(&credential_hashen("alice"), &credential_hashen("secret")));
    }

    #[test]
    fn falsches_passwort_oder_unbekannter_benutzer() {
        let store = CredentialStore::aus_text(&alice_zeile()).unwrap();
        assert!(!store.ist_gueltig(&credential_hashen("alice"), &credential_hashen("wrong")));
        assert!(!store.ist_gueltig(&credential_hashen("eve"), &credential_hashen("secret")));
        // Vertauschte Felder sind kein gueltiges Paar
        assert!(!store.ist_gueltig(&credential_hashen("secret"), &credential_hashen("alice")));
    }

    #[test]
    fn leere_zeilen_werden_ignoriert() {
        let text = format!("\n{}\n   \n", alice_zeile());
        assert_eq!(CredentialStore::aus_text(&text).unwrap().anzahl(), 1);
        assert!(CredentialStore::aus_text("").unwrap().ist_leer());
    }

    #[test]
    fn eintrag_ohne_passwort_ist_fehlerhaft() {
        let text = format!("{}\n{}\n", alice_zeile().trim(), credential_hashen("bob"));
        match CredentialStore::aus_text(&text) {
            Err(AuthError::WhitelistFehlerhaft { zeile, .. }) => assert_eq!(zeile, 2),
            other => panic!("Fehler erwartet, erhalten: {other:?}"),
        }
    }

    #[test]
    fn eintrag_mit_kaputtem_hash_ist_fehlerhaft() {
        let text = format!("{} nichthex\n", credential_hashen("alice"));
        let fehler = CredentialStore::aus_text(&text).unwrap_err();
        assert!(fehler.ist_ladefehler());
    }

    #[test]
    fn fehlende_datei_ist_ladefehler() {
        let dir = tempfile::tempdir().unwrap();
        let fehler = CredentialStore::laden(dir.path().join("whitelist.txt")).unwrap_err();
        assert!(matches!(fehler, AuthError::WhitelistNichtLesbar { .. }));
        assert!(fehler.ist_ladefehler());
    }

    #[test]
    fn hinzufuegen_lehnt_vorhandenen_benutzer_ab() {
        let store = CredentialStore::aus_text(&alice_zeile()).unwrap();
        let ergebnis = store.hinzufuegen(credential_hashen("alice"), credential_hashen("anders"));
        assert!(matches!(ergebnis, Err(AuthError::BenutzerExistiert)));
        // Altes Passwort gilt weiterhin
        assert!(store.ist_gueltig(&credential_hashen("alice"), &credential_hashen("secret")));
    }

    #[test]
    fn speichern_und_wieder_laden() {
        let dir = tempfile::tempdir().unwrap();
        let pfad = dir.path().join("whitelist.txt");

        let store = CredentialStore::neu();
        store
            .hinzufuegen(credential_hashen("alice"), credential_hashen("secret"))
            .unwrap();
        store
            .hinzufuegen(credential_hashen("bob"), credential_hashen("hunter2"))
            .unwrap();
        store.speichern(&pfad).unwrap();

        let geladen = CredentialStore::laden(&pfad).unwrap();
        assert_eq!(geladen.anzahl(), 2);
        assert!(geladen.ist_gueltig(&credential_hashen("bob"), &credential_hashen("hunter2")));
        assert_eq!(geladen.zu_text(), store.zu_text());
    }

    #[test]
    fn pruefung_waehrend_hinzufuegen() {
        let store = Arc::new(CredentialStore::aus_text(&alice_zeile()).unwrap());
        let alice = credential_hashen("alice");
        let secret = credential_hashen("secret");

        let schreiber = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let benutzer = credential_hashen(&format!("user{i}"));
                    store.hinzufuegen(benutzer, credential_hashen("pw")).unwrap();
                }
            })
        };

        for _ in 0..200 {
            assert!(store.ist_gueltig(&alice, &secret));
        }
        schreiber.join().unwrap();
        assert_eq!(store.anzahl(), 201);
    }
}
