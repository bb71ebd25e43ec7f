//! hinterzimmer-signaling – Zulassung und Broadcast-Hub
//!
//! Dieser Crate implementiert den Relay-Service: er nimmt TCP-Verbindungen
//! an, prueft Anmeldedaten gegen die Whitelist, verteilt den
//! Sitzungsschluessel und leitet jeden Frame an alle Mitglieder weiter.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (RelayServer)
//!     |
//!     v
//! ConnectionHandler (pro Verbindung ein Task)
//!     |  State Machine: WartetAufAnmeldung -> Abgelehnt | Aktiv -> Geschlossen
//!     |
//!     v
//! SessionRegistry – Send-Queue pro Mitglied, Broadcast an alle
//! ```

pub mod connection;
pub mod error;
pub mod registry;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use connection::{ConnectionHandler, VerbindungsEnde, VerbindungsZustand};
pub use error::{SignalingError, SignalingResult};
pub use registry::{Mitgliedschaft, SessionRegistry};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::RelayServer;
