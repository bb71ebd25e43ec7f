//! hinterzimmer-auth – Whitelist und Anmeldedaten
//!
//! Dieses Crate implementiert:
//! - Hashing von Benutzername und Passwort (SHA-256, hex)
//! - CredentialStore (Whitelist aus Datei, Pruefung, Administration)

pub mod credential;
pub mod error;
pub mod whitelist;

// Bequeme Re-Exporte
pub use credential::credential_hashen;
pub use error::{AuthError, AuthResult};
pub use whitelist::CredentialStore;
