//! ConnectionHandler – Verwaltet eine einzelne Verbindung
//!
//! Jede angenommene Verbindung bekommt einen `ConnectionHandler` in einem
//! eigenen tokio-Task. Die State Machine verwaltet den Verbindungszustand.
//!
//! ## State Machine
//! ```text
//! WartetAufAnmeldung -> Abgelehnt ------------------+
//!         |                                          v
//!         +-----------> Aktiv -----------------> Geschlossen
//! ```
//!
//! Der Handshake ist genau ein Frame pro Richtung. Danach liest der
//! Handler Frames, entschluesselt sie nur um den Trenn-Sentinel zu
//! erkennen, und gibt alle anderen unveraendert an die Registry weiter.
//! Ausgehende Frames schreibt ein eigener Schreib-Task aus der Queue des
//! Mitglieds.
//!
//! Beim Uebergang nach `Geschlossen` wird das Mitglied genau einmal
//! abgemeldet, egal aus welchem Grund die Verbindung endet.

use futures_util::{SinkExt, StreamExt};
use hinterzimmer_core::MemberId;
use hinterzimmer_crypto::asymmetric;
use hinterzimmer_protocol::{
    Anmeldedaten, FrameCodec, HandshakeAntwort, HandshakeRequest, TRENN_SENTINEL,
};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::{SignalingError, SignalingResult};
use crate::registry::{BroadcastFrame, Mitgliedschaft};
use crate::server_state::SignalingState;

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Zustand einer Verbindung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbindungsZustand {
    /// Verbunden, Handshake-Frame steht noch aus
    WartetAufAnmeldung,
    /// Anmeldedaten ungueltig, Ablehnung wurde gesendet
    Abgelehnt,
    /// Zugelassen und in der Registry
    Aktiv,
    /// Beendet und abgemeldet
    Geschlossen,
}

/// Grund fuer das Ende einer Verbindung
#[derive(Debug)]
pub enum VerbindungsEnde {
    /// Anmeldedaten ungueltig
    Abgelehnt,
    /// Mitglied hat den Trenn-Sentinel gesendet
    Verlassen,
    /// Gegenstelle hat die Verbindung geschlossen
    Getrennt,
    /// Mitglied wurde von der Registry entfernt (Queue voll, Schreibfehler)
    Entfernt,
    /// Lese-, Krypto- oder Protokollfehler
    Fehler(SignalingError),
}

type Leser<S> = FramedRead<ReadHalf<S>, FrameCodec>;
type Schreiber<S> = FramedWrite<WriteHalf<S>, FrameCodec>;

// ---------------------------------------------------------------------------
// ConnectionHandler
// ---------------------------------------------------------------------------

/// Verarbeitet eine einzelne Verbindung von Handshake bis Abmeldung
pub struct ConnectionHandler {
    state: Arc<SignalingState>,
    peer: String,
    member_id: MemberId,
    zustand: VerbindungsZustand,
}

impl ConnectionHandler {
    /// Erstellt einen neuen ConnectionHandler
    ///
    /// `peer` dient nur dem Logging (z.B. die Socket-Adresse).
    pub fn neu(state: Arc<SignalingState>, peer: impl std::fmt::Display) -> Self {
        Self {
            state,
            peer: peer.to_string(),
            member_id: MemberId::new(),
            zustand: VerbindungsZustand::WartetAufAnmeldung,
        }
    }

    /// Verarbeitet die Verbindung bis zu ihrem Ende
    ///
    /// Fehler bleiben lokal: sie beenden nur diese Verbindung und werden
    /// als `VerbindungsEnde` zurueckgegeben. Der Stream ist danach freigegeben.
    pub async fn verarbeiten<S>(mut self, stream: S) -> VerbindungsEnde
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        tracing::debug!(peer = %self.peer, member = %self.member_id, "Neue Verbindung");

        let codec = FrameCodec::with_max_size(self.state.config.max_frame_laenge);
        let (lese_haelfte, schreib_haelfte) = tokio::io::split(stream);
        let mut leser = FramedRead::new(lese_haelfte, codec.clone());
        let mut schreiber = FramedWrite::new(schreib_haelfte, codec);

        let ende = match self.handshake(&mut leser, &mut schreiber).await {
            Ok(true) => self.aktiv(leser, schreiber).await,
            Ok(false) => {
                self.zustand = VerbindungsZustand::Abgelehnt;
                VerbindungsEnde::Abgelehnt
            }
            Err(e) => VerbindungsEnde::Fehler(e),
        };

        self.schliessen(&ende);
        ende
    }

    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------

    /// Liest den Handshake-Frame und sendet genau eine Antwort
    ///
    /// Gibt `true` zurueck wenn die Anmeldedaten gueltig waren.
    async fn handshake<S>(
        &mut self,
        leser: &mut Leser<S>,
        schreiber: &mut Schreiber<S>,
    ) -> SignalingResult<bool>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let frame = match self.state.config.handshake_timeout() {
            Some(dauer) => tokio::time::timeout(dauer, leser.next())
                .await
                .map_err(|_| SignalingError::Timeout)?,
            None => leser.next().await,
        };
        let frame = frame.ok_or(SignalingError::VerbindungGetrennt)??;

        let anfrage = HandshakeRequest::parse(&frame)?;
        let client_key = asymmetric::public_key_aus_base64(&anfrage.client_public_key)?;

        // Ab hier kann geantwortet werden: unbrauchbare Anmeldedaten sind eine Ablehnung
        let zugelassen = match self
            .state
            .server_schluessel
            .entschluesseln(&anfrage.anmeldedaten_chiffrat)
        {
            Ok(klartext) => self.anmeldedaten_pruefen(&klartext),
            Err(e) => {
                tracing::debug!(peer = %self.peer, fehler = %e, "Anmeldedaten nicht entschluesselbar");
                false
            }
        };

        let antwort = if zugelassen {
            HandshakeAntwort::Zugelassen(self.state.session_key.kodieren())
        } else {
            HandshakeAntwort::Abgelehnt
        };
        let chiffrat = asymmetric::verschluesseln(antwort.to_klartext(), &client_key)?;
        schreiber.send(chiffrat).await?;

        if zugelassen {
            tracing::info!(peer = %self.peer, member = %self.member_id, "Mitglied zugelassen");
        } else {
            tracing::warn!(peer = %self.peer, "Anmeldedaten abgelehnt");
        }
        Ok(zugelassen)
    }

    fn anmeldedaten_pruefen(&self, klartext: &str) -> bool {
        match Anmeldedaten::parse(klartext) {
            Ok(daten) => self.state.whitelist.ist_gueltig(&daten.benutzer, &daten.passwort),
            Err(e) => {
                tracing::debug!(peer = %self.peer, fehler = %e, "Anmeldedaten nicht lesbar");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Aktiv
    // -----------------------------------------------------------------------

    /// Registriert das Mitglied und leitet Frames weiter bis zum Ende
    async fn aktiv<S>(&mut self, mut leser: Leser<S>, schreiber: Schreiber<S>) -> VerbindungsEnde
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let Mitgliedschaft { frames, entfernt } = self.state.registry.registrieren(self.member_id);
        let mut schreib_task = tokio::spawn(mitglied_schreiben(self.member_id, frames, schreiber));
        self.zustand = VerbindungsZustand::Aktiv;

        let ende = loop {
            tokio::select! {
                frame = leser.next() => {
                    match frame {
                        Some(Ok(frame)) => {
                            if let Some(ende) = self.frame_verarbeiten(&frame) {
                                break ende;
                            }
                        }
                        Some(Err(e)) => break VerbindungsEnde::Fehler(e.into()),
                        None => break VerbindungsEnde::Getrennt,
                    }
                }

                // Registry hat das Mitglied entfernt (z.B. Queue voll); der
                // Schreib-Task kann dabei noch auf dem Peer blockiert sein
                _ = entfernt.cancelled() => break VerbindungsEnde::Entfernt,

                // Schreiben an den Peer fehlgeschlagen
                _ = &mut schreib_task => break VerbindungsEnde::Entfernt,
            }
        };

        schreib_task.abort();
        ende
    }

    /// Verarbeitet einen Frame im Zustand `Aktiv`
    ///
    /// Gibt `Some` zurueck wenn die Verbindung enden soll.
    fn frame_verarbeiten(&self, frame: &str) -> Option<VerbindungsEnde> {
        match self.state.session_key.entschluesseln(frame) {
            Ok(klartext) if klartext == TRENN_SENTINEL => Some(VerbindungsEnde::Verlassen),
            Ok(_) => match self.state.registry.broadcast_von(&self.member_id, frame) {
                Some(empfaenger) => {
                    tracing::trace!(member = %self.member_id, empfaenger, "Frame verteilt");
                    None
                }
                None => Some(VerbindungsEnde::Entfernt),
            },
            Err(e) => Some(VerbindungsEnde::Fehler(e.into())),
        }
    }

    // -----------------------------------------------------------------------
    // Geschlossen
    // -----------------------------------------------------------------------

    fn schliessen(&mut self, ende: &VerbindungsEnde) {
        self.state.registry.abmelden(&self.member_id);
        let vorher = std::mem::replace(&mut self.zustand, VerbindungsZustand::Geschlossen);

        match ende {
            VerbindungsEnde::Fehler(e) => {
                tracing::warn!(peer = %self.peer, member = %self.member_id, zustand = ?vorher, fehler = %e, "Verbindung wegen Fehler beendet");
            }
            ende => {
                tracing::info!(peer = %self.peer, member = %self.member_id, zustand = ?vorher, ende = ?ende, "Verbindung beendet");
            }
        }
    }
}

/// Schreib-Task eines Mitglieds: leert die Queue auf den Stream
async fn mitglied_schreiben<W>(
    member_id: MemberId,
    mut queue: mpsc::Receiver<BroadcastFrame>,
    mut schreiber: FramedWrite<W, FrameCodec>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = queue.recv().await {
        if let Err(e) = schreiber.send(frame).await {
            tracing::warn!(member = %member_id, fehler = %e, "Senden an Mitglied fehlgeschlagen");
            break;
        }
    }
}
