//! hinterzimmer-client – Client-Schnittstelle fuer eine Chat-Oberflaeche
//!
//! Die Oberflaeche ruft nur `verbinden`, `senden` und `verlassen` auf und
//! bekommt entschluesselte Nachrichten ueber einen Callback. Sockets und
//! Schluesselmaterial bleiben in diesem Crate.

pub mod connection;
pub mod error;

// Bequeme Re-Exporte
pub use connection::{
    verbinden, verbinden_ueber, ChatHandle, ClientIdentitaet, ConnectOutcome, RejectedEvent,
    ABSCHIEDS_SUFFIX, SITZUNG_IV_DATEI, SITZUNG_SCHLUESSEL_DATEI,
};
pub use error::{ClientError, ClientResult};
