//! Symmetrische Verschluesselung (AES-CBC, PKCS#7)
//!
//! Der Server erzeugt pro Lauf genau einen `SessionKey` (Schluessel + IV),
//! den alle Mitglieder fuer die gesamte Laufzeit teilen. Jeder Chat-Frame
//! wird einzeln ver- und entschluesselt, es gibt keinen Stream-Zustand.
//!
//! ## Kodierung
//! ```text
//! Chiffrat    -> Base64 (Standard-Alphabet, mit Padding)
//! Schluessel  -> Base64
//! IV          -> Base64
//! SessionKey  -> "<base64-schluessel> <base64-iv>"
//! ```

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CryptoError, CryptoResult};
use crate::types::SecretBytes;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Standard-Schluesselgroesse fuer den Sitzungsschluessel
pub const STANDARD_AES_BITS: usize = 128;

/// IV-Laenge (eine AES-Blockgroesse)
pub const IV_LAENGE: usize = 16;

// ---------------------------------------------------------------------------
// Schluesselmaterial
// ---------------------------------------------------------------------------

/// Erzeugt einen zufaelligen AES-Schluessel (128, 192 oder 256 bit)
pub fn schluessel_generieren(bits: usize) -> CryptoResult<SecretBytes> {
    if !matches!(bits, 128 | 192 | 256) {
        return Err(CryptoError::SchluesselGenerierung(format!(
            "nicht unterstuetzte AES-Schluesselgroesse: {bits} bit"
        )));
    }
    let mut bytes = vec![0u8; bits / 8];
    OsRng.fill_bytes(&mut bytes);
    Ok(SecretBytes::new(bytes))
}

/// Erzeugt einen zufaelligen IV
pub fn iv_generieren() -> [u8; IV_LAENGE] {
    let mut iv = [0u8; IV_LAENGE];
    OsRng.fill_bytes(&mut iv);
    iv
}

fn schluessel_laenge_pruefen(laenge: usize) -> CryptoResult<()> {
    match laenge {
        16 | 24 | 32 => Ok(()),
        erhalten => Err(CryptoError::UngueltigeSchluesselLaenge { erhalten }),
    }
}

/// Kodiert einen AES-Schluessel als Base64
pub fn schluessel_kodieren(schluessel: &SecretBytes) -> String {
    BASE64.encode(schluessel.as_bytes())
}

/// Dekodiert einen Base64-kodierten AES-Schluessel
pub fn schluessel_dekodieren(kodiert: &str) -> CryptoResult<SecretBytes> {
    let bytes = BASE64.decode(kodiert.trim())?;
    schluessel_laenge_pruefen(bytes.len())?;
    Ok(SecretBytes::new(bytes))
}

/// Kodiert einen IV als Base64
pub fn iv_kodieren(iv: &[u8; IV_LAENGE]) -> String {
    BASE64.encode(iv)
}

/// Dekodiert einen Base64-kodierten IV
pub fn iv_dekodieren(kodiert: &str) -> CryptoResult<[u8; IV_LAENGE]> {
    let bytes = BASE64.decode(kodiert.trim())?;
    iv_aus_bytes(&bytes)
}

pub(crate) fn iv_aus_bytes(bytes: &[u8]) -> CryptoResult<[u8; IV_LAENGE]> {
    bytes
        .try_into()
        .map_err(|_| CryptoError::UngueltigeIvLaenge {
            erwartet: IV_LAENGE,
            erhalten: bytes.len(),
        })
}

// ---------------------------------------------------------------------------
// Ver- und Entschluesselung
// ---------------------------------------------------------------------------

/// Verschluesselt einen Text-Frame und gibt das Chiffrat Base64-kodiert zurueck
pub fn verschluesseln(klartext: &str, schluessel: &[u8], iv: &[u8]) -> CryptoResult<String> {
    let daten = klartext.as_bytes();
    let ungueltig = |_| CryptoError::Verschluesselung("ungueltige Schluessel- oder IV-Laenge".into());

    let chiffrat = match schluessel.len() {
        16 => Aes128CbcEnc::new_from_slices(schluessel, iv)
            .map_err(ungueltig)?
            .encrypt_padded_vec_mut::<Pkcs7>(daten),
        24 => Aes192CbcEnc::new_from_slices(schluessel, iv)
            .map_err(ungueltig)?
            .encrypt_padded_vec_mut::<Pkcs7>(daten),
        32 => Aes256CbcEnc::new_from_slices(schluessel, iv)
            .map_err(ungueltig)?
            .encrypt_padded_vec_mut::<Pkcs7>(daten),
        erhalten => return Err(CryptoError::UngueltigeSchluesselLaenge { erhalten }),
    };

    Ok(BASE64.encode(chiffrat))
}

/// Entschluesselt einen Base64-kodierten Frame
///
/// Schlaegt fehl bei ungueltigem Base64, falscher Blocklaenge, falschem
/// Padding oder wenn der Klartext kein UTF-8 ist.
pub fn entschluesseln(chiffrat_b64: &str, schluessel: &[u8], iv: &[u8]) -> CryptoResult<String> {
    let chiffrat = BASE64.decode(chiffrat_b64.trim())?;
    let ungueltig = |_| CryptoError::Entschluesselung("ungueltige Schluessel- oder IV-Laenge".into());
    let padding = |_| CryptoError::Entschluesselung("ungueltiges Padding oder Blocklaenge".into());

    let klartext = match schluessel.len() {
        16 => Aes128CbcDec::new_from_slices(schluessel, iv)
            .map_err(ungueltig)?
            .decrypt_padded_vec_mut::<Pkcs7>(&chiffrat)
            .map_err(padding)?,
        24 => Aes192CbcDec::new_from_slices(schluessel, iv)
            .map_err(ungueltig)?
            .decrypt_padded_vec_mut::<Pkcs7>(&chiffrat)
            .map_err(padding)?,
        32 => Aes256CbcDec::new_from_slices(schluessel, iv)
            .map_err(ungueltig)?
            .decrypt_padded_vec_mut::<Pkcs7>(&chiffrat)
            .map_err(padding)?,
        erhalten => return Err(CryptoError::UngueltigeSchluesselLaenge { erhalten }),
    };

    String::from_utf8(klartext)
        .map_err(|_| CryptoError::UngueltigeDaten("Klartext ist kein UTF-8".into()))
}

// ---------------------------------------------------------------------------
// SessionKey
// ---------------------------------------------------------------------------

/// Raumweiter Sitzungsschluessel (Schluessel + IV)
///
/// Wird einmal beim Serverstart erzeugt und danach nur gelesen.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    schluessel: SecretBytes,
    iv: [u8; IV_LAENGE],
}

impl SessionKey {
    /// Erzeugt einen frischen AES-128-Sitzungsschluessel mit zufaelligem IV
    pub fn generieren() -> CryptoResult<Self> {
        Ok(Self {
            schluessel: schluessel_generieren(STANDARD_AES_BITS)?,
            iv: iv_generieren(),
        })
    }

    /// Baut einen SessionKey aus vorhandenem Material
    pub fn neu(schluessel: SecretBytes, iv: [u8; IV_LAENGE]) -> CryptoResult<Self> {
        schluessel_laenge_pruefen(schluessel.len())?;
        Ok(Self { schluessel, iv })
    }

    pub fn schluessel(&self) -> &SecretBytes {
        &self.schluessel
    }

    pub fn iv(&self) -> &[u8; IV_LAENGE] {
        &self.iv
    }

    /// Verschluesselt einen Chat-Frame
    pub fn verschluesseln(&self, klartext: &str) -> CryptoResult<String> {
        verschluesseln(klartext, self.schluessel.as_bytes(), &self.iv)
    }

    /// Entschluesselt einen Chat-Frame
    pub fn entschluesseln(&self, chiffrat_b64: &str) -> CryptoResult<String> {
        entschluesseln(chiffrat_b64, self.schluessel.as_bytes(), &self.iv)
    }

    /// Kodiert Schluessel und IV als eine Handshake-Nutzlast
    pub fn kodieren(&self) -> String {
        format!(
            "{} {}",
            schluessel_kodieren(&self.schluessel),
            iv_kodieren(&self.iv)
        )
    }

    /// Dekodiert die Handshake-Nutzlast `"<schluessel> <iv>"`
    pub fn dekodieren(nutzlast: &str) -> CryptoResult<Self> {
        let mut teile = nutzlast.split_whitespace();
        let (Some(schluessel), Some(iv), None) = (teile.next(), teile.next(), teile.next()) else {
            return Err(CryptoError::UngueltigeDaten(
                "erwartet '<schluessel> <iv>'".into(),
            ));
        };
        Self::neu(schluessel_dekodieren(schluessel)?, iv_dekodieren(iv)?)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SessionKey {{ bits: {}, schluessel: [REDACTED] }}",
            self.schluessel.len() * 8
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
