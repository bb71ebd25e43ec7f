//! # hinterzimmer-crypto
//!
//! Kryptografie fuer den Handshake und die Gruppen-Sitzung.
//!
//! ## Module
//! - `asymmetric` - RSA (PKCS#1 v1.5) fuer Anmeldedaten und Schluesselverteilung
//! - `symmetric` - AES-CBC mit PKCS#7-Padding fuer den Chat-Verkehr
//! - `key_files` - Schluesselmaterial lesen und schreiben
//! - `types` - Gemeinsame Typen (SecretBytes)
//! - `error` - Fehlertypen

pub mod asymmetric;
pub mod error;
pub mod key_files;
pub mod symmetric;
pub mod types;

// Bequeme Re-Exports
pub use asymmetric::{AsymmetricKey, AsymmetricKeyPair, KeyRole, RsaPublicKey};
pub use error::{CryptoError, CryptoResult};
pub use symmetric::SessionKey;
pub use types::SecretBytes;
