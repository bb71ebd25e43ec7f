//! hinterzimmer-core – Gemeinsame Typen
//!
//! Enthaelt die ID- und Hash-Typen, die zwischen Server, Client und den
//! Service-Crates geteilt werden.

pub mod types;

pub use types::{CredentialHash, MemberId, UngueltigerHash, HASH_HEX_LAENGE};
