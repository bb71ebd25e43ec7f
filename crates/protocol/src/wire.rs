//! Wire-Format fuer TCP-Verbindungen
//!
//! Zeilenbasiertes Protokoll: jeder Frame ist eine UTF-8-Textzeile ohne
//! Laengenpraefix, abgeschlossen durch `\n`. Ein vorangehendes `\r` wird
//! beim Lesen entfernt.
//!
//! ## Frame-Format
//!
//! ```text
//! +----------------...----------------+----+
//! | Payload (UTF-8, ohne Zeilenumbruch) | \n |
//! +----------------...----------------+----+
//! ```
//!
//! Die maximale Zeilenlaenge ist konfigurierbar (Standard: 64 KiB), damit
//! eine Gegenstelle ohne Zeilenumbruch nicht unbegrenzt Speicher belegt.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Laenge ohne Zeilenumbruch (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Frame-Trenner
pub const FRAME_TRENNER: u8 = b'\n';

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer zeilenbasierte TCP-Verbindungen
///
/// Implementiert `Decoder` (liefert `String`) und `Encoder` fuer alles was
/// `AsRef<str>` ist, fuer die Verwendung mit `FramedRead`/`FramedWrite`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximale erlaubte Frame-Laenge in Bytes
    max_frame_size: usize,
    /// Ab hier wird im Buffer nach dem naechsten Trenner gesucht
    such_index: usize,
}

impl FrameCodec {
    /// Erstellt einen neuen `FrameCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_FRAME_SIZE)
    }

    /// Erstellt einen `FrameCodec` mit benutzerdefinierter maximaler Frame-Laenge
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            such_index: 0,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Laenge zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn zu_gross(&self, laenge: usize) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                laenge, self.max_frame_size
            ),
        )
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn zeile_zu_string(mut zeile: BytesMut) -> io::Result<String> {
    if zeile.last() == Some(&b'\r') {
        zeile.truncate(zeile.len() - 1);
    }
    String::from_utf8(zeile.to_vec()).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "Frame ist kein gueltiges UTF-8")
    })
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for FrameCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let trenner = src[self.such_index..]
            .iter()
            .position(|b| *b == FRAME_TRENNER)
            .map(|offset| self.such_index + offset);

        match trenner {
            Some(index) => {
                self.such_index = 0;
                if index > self.max_frame_size {
                    return Err(self.zu_gross(index));
                }
                let mut zeile = src.split_to(index + 1);
                zeile.truncate(index);
                zeile_zu_string(zeile).map(Some)
            }
            None => {
                if src.len() > self.max_frame_size {
                    return Err(self.zu_gross(src.len()));
                }
                // Bereits durchsuchte Bytes beim naechsten Aufruf ueberspringen
                self.such_index = src.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        self.such_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        // Letzte Zeile ohne abschliessenden Trenner
        let rest = src.split_to(src.len());
        zeile_zu_string(rest).map(Some)
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl<T> Encoder<T> for FrameCodec
where
    T: AsRef<str>,
{
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let zeile = item.as_ref();

        if zeile.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Frame darf keinen Zeilenumbruch enthalten",
            ));
        }
        if zeile.len() > self.max_frame_size {
            return Err(self.zu_gross(zeile.len()));
        }

        dst.reserve(zeile.len() + 1);
        dst.put_slice(zeile.as_bytes());
        dst.put_u8(FRAME_TRENNER);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
