//! Schluesselmaterial in Dateien
//!
//! Jeder Schluessel liegt als rohe kodierte Bytes in einer eigenen Datei:
//! oeffentliche Schluessel als X.509 DER, private als PKCS#8 DER,
//! Sitzungsschluessel und IV als rohe Bytes.

use std::fs;
use std::path::Path;

use crate::asymmetric::{AsymmetricKey, AsymmetricKeyPair, KeyRole, RsaPublicKey};
use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::{iv_aus_bytes, SessionKey};
use crate::types::SecretBytes;

/// Liest einen Schluessel der angegebenen Rolle
pub fn schluessel_lesen(pfad: impl AsRef<Path>, rolle: KeyRole) -> CryptoResult<AsymmetricKey> {
    let bytes = fs::read(pfad.as_ref())?;
    AsymmetricKey::dekodieren(&bytes, rolle)
}

/// Liest einen oeffentlichen Schluessel (z.B. den des Servers auf dem Client)
pub fn public_key_lesen(pfad: impl AsRef<Path>) -> CryptoResult<RsaPublicKey> {
    match schluessel_lesen(pfad, KeyRole::Oeffentlich)? {
        AsymmetricKey::Oeffentlich(key) => Ok(key),
        AsymmetricKey::Privat(_) => Err(CryptoError::SchluesselKodierung(
            "oeffentlicher Schluessel erwartet".into(),
        )),
    }
}

/// Liest einen privaten Schluessel und leitet das Paar daraus ab
pub fn schluesselpaar_lesen(privat_pfad: impl AsRef<Path>) -> CryptoResult<AsymmetricKeyPair> {
    AsymmetricKeyPair::try_from(schluessel_lesen(privat_pfad, KeyRole::Privat)?)
}

/// Schreibt beide Haelften eines Schluessel-Paares
///
/// Die Datei des privaten Schluessels ist unter Unix nur fuer den
/// Besitzer lesbar.
pub fn schluesselpaar_schreiben(
    paar: &AsymmetricKeyPair,
    oeffentlich_pfad: impl AsRef<Path>,
    privat_pfad: impl AsRef<Path>,
) -> CryptoResult<()> {
    fs::write(oeffentlich_pfad.as_ref(), paar.oeffentlich_kodieren()?)?;
    geheim_schreiben(privat_pfad.as_ref(), &paar.privat_kodieren()?)?;
    tracing::debug!(
        oeffentlich = %oeffentlich_pfad.as_ref().display(),
        privat = %privat_pfad.as_ref().display(),
        "Schluessel-Paar geschrieben"
    );
    Ok(())
}

/// Schreibt Sitzungsschluessel und IV in je eine Datei
pub fn session_key_schreiben(
    key: &SessionKey,
    schluessel_pfad: impl AsRef<Path>,
    iv_pfad: impl AsRef<Path>,
) -> CryptoResult<()> {
    geheim_schreiben(schluessel_pfad.as_ref(), key.schluessel().as_bytes())?;
    fs::write(iv_pfad.as_ref(), key.iv())?;
    Ok(())
}

/// Liest Sitzungsschluessel und IV aus ihren Dateien
pub fn session_key_lesen(
    schluessel_pfad: impl AsRef<Path>,
    iv_pfad: impl AsRef<Path>,
) -> CryptoResult<SessionKey> {
    let schluessel = SecretBytes::new(fs::read(schluessel_pfad.as_ref())?);
    let iv = iv_aus_bytes(&fs::read(iv_pfad.as_ref())?)?;
    SessionKey::neu(schluessel, iv)
}

fn geheim_schreiben(pfad: &Path, bytes: &[u8]) -> CryptoResult<()> {
    fs::write(pfad, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(pfad, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
