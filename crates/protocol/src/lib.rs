//! hinterzimmer-protocol – Wire-Format und Handshake
//!
//! Alle Frames sind einzelne Textzeilen, getrennt durch `\n`.
//!
//! ```text
//! Client -> Server   "<anmeldedaten-hex> <client-public-key-base64>"
//! Server -> Client   "<rsa-chiffrat-hex>"   (Ablehnung oder Sitzungsschluessel)
//! danach beidseitig  "<aes-chiffrat-base64>"
//! ```

pub mod handshake;
pub mod wire;

pub use handshake::{
    Anmeldedaten, HandshakeAntwort, HandshakeRequest, ProtocolError, ABLEHNUNGS_MARKER,
    TRENN_SENTINEL,
};
pub use wire::FrameCodec;
