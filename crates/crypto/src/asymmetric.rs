//! Asymmetrische Verschluesselung (RSA, PKCS#1 v1.5)
//!
//! Wird nur im Handshake verwendet: der Client verschluesselt seine
//! Anmeldedaten mit dem oeffentlichen Server-Schluessel, der Server
//! antwortet mit dem oeffentlichen Schluessel des Clients.
//!
//! ## Kodierung
//! ```text
//! Chiffrat           -> Hex (Kleinbuchstaben)
//! Oeffentl. Schluessel -> X.509 SubjectPublicKeyInfo (DER), im Handshake Base64
//! Privater Schluessel  -> PKCS#8 (DER)
//! ```
//!
//! Es gibt keine Verkettung: eine Nachricht muss in einen einzelnen
//! RSA-Block passen (Modulus-Laenge minus 11 Bytes Padding).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey};

pub use rsa::RsaPublicKey;

use crate::error::{CryptoError, CryptoResult};

/// Modulus-Groesse fuer neue Schluessel, wenn nichts anderes angegeben ist
pub const STANDARD_RSA_BITS: usize = 2048;

/// Kleinste unterstuetzte Modulus-Groesse
pub const MIN_RSA_BITS: usize = 1024;

/// Groesste unterstuetzte Modulus-Groesse
///
/// Entspricht `RsaPublicKey::MAX_SIZE`: groessere oeffentliche Schluessel
/// lassen sich nicht mehr aus DER dekodieren.
pub const MAX_RSA_BITS: usize = 4096;

/// Overhead des PKCS#1 v1.5 Paddings in Bytes
const PKCS1_OVERHEAD: usize = 11;

// ---------------------------------------------------------------------------
// Schluessel
// ---------------------------------------------------------------------------

/// Rolle eines kodierten Schluessels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Oeffentlich,
    Privat,
}

/// Ein einzelner oeffentlicher oder privater RSA-Schluessel
#[derive(Clone)]
pub enum AsymmetricKey {
    Oeffentlich(RsaPublicKey),
    Privat(RsaPrivateKey),
}

impl AsymmetricKey {
    /// Rolle des Schluessels
    pub fn rolle(&self) -> KeyRole {
        match self {
            Self::Oeffentlich(_) => KeyRole::Oeffentlich,
            Self::Privat(_) => KeyRole::Privat,
        }
    }

    /// Kodiert den Schluessel in seine DER-Form
    pub fn kodieren(&self) -> CryptoResult<Vec<u8>> {
        match self {
            Self::Oeffentlich(key) => key
                .to_public_key_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| CryptoError::SchluesselKodierung(e.to_string())),
            Self::Privat(key) => key
                .to_pkcs8_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| CryptoError::SchluesselKodierung(e.to_string())),
        }
    }

    /// Dekodiert DER-Bytes als Schluessel der angegebenen Rolle
    pub fn dekodieren(bytes: &[u8], rolle: KeyRole) -> CryptoResult<Self> {
        match rolle {
            KeyRole::Oeffentlich => RsaPublicKey::from_public_key_der(bytes)
                .map(Self::Oeffentlich)
                .map_err(|e| CryptoError::SchluesselKodierung(e.to_string())),
            KeyRole::Privat => RsaPrivateKey::from_pkcs8_der(bytes)
                .map(Self::Privat)
                .map_err(|e| CryptoError::SchluesselKodierung(e.to_string())),
        }
    }
}

impl std::fmt::Debug for AsymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oeffentlich(key) => write!(f, "AsymmetricKey::Oeffentlich({} bit)", key.size() * 8),
            Self::Privat(_) => write!(f, "AsymmetricKey::Privat([REDACTED])"),
        }
    }
}

// ---------------------------------------------------------------------------
// Schluessel-Paar
// ---------------------------------------------------------------------------

/// RSA-Schluessel-Paar eines Teilnehmers (Server oder Client)
///
/// Jeder Teilnehmer besitzt genau ein Paar fuer die Laufzeit des Prozesses.
#[derive(Clone)]
pub struct AsymmetricKeyPair {
    privat: RsaPrivateKey,
    oeffentlich: RsaPublicKey,
}

impl AsymmetricKeyPair {
    /// Erzeugt ein frisches Schluessel-Paar mit der gegebenen Modulus-Groesse
    pub fn generieren(bits: usize) -> CryptoResult<Self> {
        if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) || bits % 8 != 0 {
            return Err(CryptoError::SchluesselGenerierung(format!(
                "nicht unterstuetzte Modulus-Groesse: {bits} bit \
                 (erlaubt {MIN_RSA_BITS}..={MAX_RSA_BITS}, Vielfaches von 8)"
            )));
        }

        let privat = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CryptoError::SchluesselGenerierung(e.to_string()))?;
        tracing::debug!(bits, "RSA-Schluessel-Paar erzeugt");
        Ok(Self::aus_privatem_schluessel(privat))
    }

    /// Baut das Paar aus einem vorhandenen privaten Schluessel
    pub fn aus_privatem_schluessel(privat: RsaPrivateKey) -> Self {
        let oeffentlich = RsaPublicKey::from(&privat);
        Self { privat, oeffentlich }
    }

    /// Oeffentlicher Teil des Paares
    pub fn oeffentlich(&self) -> &RsaPublicKey {
        &self.oeffentlich
    }

    /// Kodiert den privaten Schluessel (PKCS#8 DER)
    pub fn privat_kodieren(&self) -> CryptoResult<Vec<u8>> {
        AsymmetricKey::Privat(self.privat.clone()).kodieren()
    }

    /// Kodiert den oeffentlichen Schluessel (X.509 DER)
    pub fn oeffentlich_kodieren(&self) -> CryptoResult<Vec<u8>> {
        AsymmetricKey::Oeffentlich(self.oeffentlich.clone()).kodieren()
    }

    /// Entschluesselt ein hex-kodiertes Chiffrat mit dem privaten Schluessel
    pub fn entschluesseln(&self, chiffrat_hex: &str) -> CryptoResult<String> {
        entschluesseln(chiffrat_hex, &self.privat)
    }
}

impl TryFrom<AsymmetricKey> for AsymmetricKeyPair {
    type Error = CryptoError;

    fn try_from(key: AsymmetricKey) -> Result<Self, Self::Error> {
        match key {
            AsymmetricKey::Privat(privat) => Ok(Self::aus_privatem_schluessel(privat)),
            AsymmetricKey::Oeffentlich(_) => Err(CryptoError::SchluesselKodierung(
                "Schluessel-Paar braucht einen privaten Schluessel".into(),
            )),
        }
    }
}

impl std::fmt::Debug for AsymmetricKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AsymmetricKeyPair {{ bits: {}, privat: [REDACTED] }}",
            self.oeffentlich.size() * 8
        )
    }
}

// ---------------------------------------------------------------------------
// Ver- und Entschluesselung
// ---------------------------------------------------------------------------

/// Maximale Klartext-Laenge in Bytes fuer einen Schluessel
pub fn max_klartext_laenge(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(PKCS1_OVERHEAD)
}

/// Verschluesselt einen kurzen Text mit einem oeffentlichen Schluessel
///
/// Gibt das Chiffrat hex-kodiert zurueck.
pub fn verschluesseln(klartext: &str, key: &RsaPublicKey) -> CryptoResult<String> {
    let max = max_klartext_laenge(key);
    if klartext.len() > max {
        return Err(CryptoError::NutzlastZuGross {
            max,
            erhalten: klartext.len(),
        });
    }

    let chiffrat = key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, klartext.as_bytes())
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;
    Ok(hex::encode(chiffrat))
}

/// Entschluesselt ein hex-kodiertes Chiffrat mit einem privaten Schluessel
pub fn entschluesseln(chiffrat_hex: &str, key: &RsaPrivateKey) -> CryptoResult<String> {
    let chiffrat = hex::decode(chiffrat_hex.trim())?;
    let klartext = key
        .decrypt(Pkcs1v15Encrypt, &chiffrat)
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))?;
    String::from_utf8(klartext)
        .map_err(|_| CryptoError::UngueltigeDaten("Klartext ist kein UTF-8".into()))
}

// ---------------------------------------------------------------------------
// Transport-Kodierung
// ---------------------------------------------------------------------------

/// Kodiert einen oeffentlichen Schluessel als Base64 (fuer den Handshake-Frame)
pub fn public_key_zu_base64(key: &RsaPublicKey) -> CryptoResult<String> {
    let der = AsymmetricKey::Oeffentlich(key.clone()).kodieren()?;
    Ok(BASE64.encode(der))
}

/// Dekodiert einen Base64-kodierten oeffentlichen Schluessel
pub fn public_key_aus_base64(kodiert: &str) -> CryptoResult<RsaPublicKey> {
    let der = BASE64.decode(kodiert.trim())?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CryptoError::SchluesselKodierung(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    fn schluesselpaar() -> &'static AsymmetricKeyPair {
        static PAAR: OnceLock<AsymmetricKeyPair> = OnceLock::new();
        PAAR.get_or_init(|| AsymmetricKeyPair::generieren(STANDARD_RSA_BITS).unwrap())
    }

    #[test]
    fn verschluesseln_und_entschluesseln() {
        let paar = schluesselpaar();
        let nachricht = "aaaa bbbb";

        let chiffrat = verschluesseln(nachricht, paar.oeffentlich()).unwrap();
        assert!(chiffrat.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(chiffrat.len(), 2 * 256);

        let klartext = paar.entschluesseln(&chiffrat).unwrap();
        assert_eq!(klartext, nachricht);
    }

    #[test]
    fn anmeldedaten_passen_in_einen_block() {
        let paar = schluesselpaar();
        // Zwei SHA-256-Hex-Digests mit Leerzeichen
        let anmeldedaten = format!("{} {}", "a".repeat(64), "b".repeat(64));
        let chiffrat = verschluesseln(&anmeldedaten, paar.oeffentlich()).unwrap();
        assert_eq!(paar.entschluesseln(&chiffrat).unwrap(), anmeldedaten);
    }

    #[test]
    fn zu_grosse_nutzlast_wird_abgelehnt() {
        let paar = schluesselpaar();
        let max = max_klartext_laenge(paar.oeffentlich());
        assert_eq!(max, 245);

        let zu_gross = "x".repeat(max + 1);
        let ergebnis = verschluesseln(&zu_gross, paar.oeffentlich());
        assert!(matches!(
            ergebnis,
            Err(CryptoError::NutzlastZuGross { max: 245, erhalten: 246 })
        ));
    }

    #[test]
    fn entschluesseln_mit_falschem_schluessel_schlaegt_fehl() {
        let paar = schluesselpaar();
        let fremd = AsymmetricKeyPair::generieren(MIN_RSA_BITS).unwrap();

        let chiffrat = verschluesseln("geheim", fremd.oeffentlich()).unwrap();
        assert!(paar.entschluesseln(&chiffrat).is_err());
    }

    #[test]
    fn entschluesseln_lehnt_kein_hex_ab() {
        let paar = schluesselpaar();
        assert!(matches!(
            paar.entschluesseln("kein hex!"),
            Err(CryptoError::Hex(_))
        ));
    }

    #[test]
    fn nicht_unterstuetzte_modulus_groesse() {
        assert!(matches!(
            AsymmetricKeyPair::generieren(512),
            Err(CryptoError::SchluesselGenerierung(_))
        ));
        assert!(matches!(
            AsymmetricKeyPair::generieren(2047),
            Err(CryptoError::SchluesselGenerierung(_))
        ));
        assert!(matches!(
            AsymmetricKeyPair::generieren(MAX_RSA_BITS + 8),
            Err(CryptoError::SchluesselGenerierung(_))
        ));
    }

    #[test]
    fn groesster_schluessel_ist_dekodierbar() {
        let paar = AsymmetricKeyPair::generieren(MAX_RSA_BITS).unwrap();
        let der = paar.oeffentlich_kodieren().unwrap();

        let dekodiert = AsymmetricKey::dekodieren(&der, KeyRole::Oeffentlich).unwrap();
        assert_eq!(dekodiert.kodieren().unwrap(), der);

        let kodiert = public_key_zu_base64(paar.oeffentlich()).unwrap();
        let key = public_key_aus_base64(&kodiert).unwrap();
        let chiffrat = verschluesseln("gross", &key).unwrap();
        assert_eq!(paar.entschluesseln(&chiffrat).unwrap(), "gross");
    }

    #[test]
    fn oeffentlicher_schluessel_kodierung_ist_exakt() {
        let paar = schluesselpaar();
        let der = paar.oeffentlich_kodieren().unwrap();

        let dekodiert = AsymmetricKey::dekodieren(&der, KeyRole::Oeffentlich).unwrap();
        assert_eq!(dekodiert.rolle(), KeyRole::Oeffentlich);
        assert_eq!(dekodiert.kodieren().unwrap(), der);
    }

    #[test]
    fn privater_schluessel_kodierung_ist_exakt() {
        let paar = schluesselpaar();
        let der = paar.privat_kodieren().unwrap();

        let dekodiert = AsymmetricKey::dekodieren(&der, KeyRole::Privat).unwrap();
        assert_eq!(dekodiert.kodieren().unwrap(), der);

        // Aus dem dekodierten Schluessel muss dasselbe Paar entstehen
        let wiederhergestellt = AsymmetricKeyPair::try_from(dekodiert).unwrap();
        assert_eq!(wiederhergestellt.oeffentlich(), paar.oeffentlich());
    }

    #[test]
    fn oeffentlicher_schluessel_ist_kein_paar() {
        let paar = schluesselpaar();
        let key = AsymmetricKey::Oeffentlich(paar.oeffentlich().clone());
        assert!(AsymmetricKeyPair::try_from(key).is_err());
    }

    #[test]
    fn base64_transport_round_trip() {
        let paar = schluesselpaar();
        let kodiert = public_key_zu_base64(paar.oeffentlich()).unwrap();
        assert!(!kodiert.contains(' '));

        let dekodiert = public_key_aus_base64(&kodiert).unwrap();
        assert_eq!(&dekodiert, paar.oeffentlich());
    }

    #[test]
    fn dekodieren_mit_falscher_rolle_schlaegt_fehl() {
        let paar = schluesselpaar();
        let der = paar.oeffentlich_kodieren().unwrap();
        assert!(AsymmetricKey::dekodieren(&der, KeyRole::Privat).is_err());
    }

    #[test]
    fn debug_verraet_privaten_schluessel_nicht() {
        let ausgabe = format!("{:?}", schluesselpaar());
        assert!(ausgabe.contains("REDACTED"));
        assert!(ausgabe.contains("2048"));
    }
}
