//! Client-seitige Verbindung zum Hinterzimmer-Server
//!
//! Nutzt den FrameCodec aus hinterzimmer-protocol fuer das Wire-Format
//! (eine Textzeile pro Frame). Nach der Zulassung liest ein eigener Task
//! alle Broadcast-Frames, entschluesselt sie und uebergibt den Klartext
//! an den Callback der Oberflaeche.

use futures_util::{SinkExt, StreamExt};
use hinterzimmer_auth::credential_hashen;
use hinterzimmer_crypto::{asymmetric, key_files, AsymmetricKeyPair, RsaPublicKey, SessionKey};
use hinterzimmer_protocol::{
    Anmeldedaten, FrameCodec, HandshakeAntwort, HandshakeRequest, TRENN_SENTINEL,
};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::error::{ClientError, ClientResult};

/// Text nach dem Benutzernamen in der Abschiedsnachricht
pub const ABSCHIEDS_SUFFIX: &str = "has left the chat";

/// Dateiname des gespeicherten Sitzungsschluessels
pub const SITZUNG_SCHLUESSEL_DATEI: &str = "secret_key";

/// Dateiname des gespeicherten IVs
pub const SITZUNG_IV_DATEI: &str = "iv";

/// Wie lange `verlassen` auf das Schliessen durch den Server wartet
const ABSCHIED_TIMEOUT: Duration = Duration::from_secs(5);

type Schreiber = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, FrameCodec>;

// ---------------------------------------------------------------------------
// Ergebnis-Typen
// ---------------------------------------------------------------------------

/// Schluesselmaterial eines Clients
#[derive(Debug, Clone)]
pub struct ClientIdentitaet {
    /// Eigenes Schluesselpaar; der oeffentliche Teil geht im Handshake mit
    pub schluessel: AsymmetricKeyPair,
    /// Vorab verteilter oeffentlicher Schluessel des Servers
    pub server_key: RsaPublicKey,
}

/// Server hat die Anmeldedaten abgelehnt
///
/// Ein neuer Versuch braucht eine neue Verbindung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEvent {
    pub benutzername: String,
}

/// Ergebnis von `verbinden`
#[derive(Debug)]
pub enum ConnectOutcome {
    Zugelassen(ChatHandle),
    Abgelehnt(RejectedEvent),
}

// ---------------------------------------------------------------------------
// Verbindungsaufbau
// ---------------------------------------------------------------------------

/// Baut eine TCP-Verbindung auf und fuehrt den Handshake durch
///
/// `bei_nachricht` wird fuer jeden entschluesselten Broadcast-Frame
/// aufgerufen, auch fuer eigene Nachrichten.
pub async fn verbinden<A, F>(
    adresse: A,
    benutzername: &str,
    passwort: &str,
    identitaet: &ClientIdentitaet,
    bei_nachricht: F,
) -> ClientResult<ConnectOutcome>
where
    A: ToSocketAddrs,
    F: FnMut(String) + Send + 'static,
{
    let stream = TcpStream::connect(adresse).await?;
    stream.set_nodelay(true)?;
    tracing::info!(peer = ?stream.peer_addr().ok(), "TCP-Verbindung hergestellt");
    verbinden_ueber(stream, benutzername, passwort, identitaet, bei_nachricht).await
}

/// Wie `verbinden`, aber ueber einen bereits geoeffneten Stream
pub async fn verbinden_ueber<S, F>(
    stream: S,
    benutzername: &str,
    passwort: &str,
    identitaet: &ClientIdentitaet,
    bei_nachricht: F,
) -> ClientResult<ConnectOutcome>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    F: FnMut(String) + Send + 'static,
{
    let (lese_haelfte, schreib_haelfte) = tokio::io::split(stream);
    let mut leser = FramedRead::new(lese_haelfte, FrameCodec::new());
    let schreib_haelfte: Box<dyn AsyncWrite + Send + Unpin> = Box::new(schreib_haelfte);
    let mut schreiber = FramedWrite::new(schreib_haelfte, FrameCodec::new());

    // Nur Hashes verlassen das Geraet
    let anmeldedaten = Anmeldedaten::neu(credential_hashen(benutzername), credential_hashen(passwort));
    let anfrage = HandshakeRequest {
        anmeldedaten_chiffrat: asymmetric::verschluesseln(
            &anmeldedaten.to_klartext(),
            &identitaet.server_key,
        )?,
        client_public_key: asymmetric::public_key_zu_base64(identitaet.schluessel.oeffentlich())?,
    };
    schreiber.send(anfrage.to_frame()).await?;

    let antwort = leser.next().await.ok_or(ClientError::VerbindungGetrennt)??;
    let klartext = identitaet.schluessel.entschluesseln(&antwort)?;

    match HandshakeAntwort::aus_klartext(&klartext) {
        HandshakeAntwort::Abgelehnt => {
            tracing::info!(benutzer = benutzername, "Anmeldedaten abgelehnt");
            Ok(ConnectOutcome::Abgelehnt(RejectedEvent {
                benutzername: benutzername.to_string(),
            }))
        }
        HandshakeAntwort::Zugelassen(nutzlast) => {
            let session_key = SessionKey::dekodieren(&nutzlast).map_err(|e| {
                ClientError::UnerwarteteAntwort(format!("Sitzungsschluessel unlesbar: {e}"))
            })?;
            tracing::info!(benutzer = benutzername, "Zugelassen");

            let empfang_task = tokio::spawn(empfangen(leser, session_key.clone(), bei_nachricht));
            Ok(ConnectOutcome::Zugelassen(ChatHandle {
                benutzername: benutzername.to_string(),
                session_key,
                schreiber,
                empfang_task,
            }))
        }
    }
}

/// Empfangs-Task: entschluesselt Broadcast-Frames bis zum Verbindungsende
async fn empfangen<R, F>(mut leser: FramedRead<R, FrameCodec>, session_key: SessionKey, mut bei_nachricht: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    while let Some(frame) = leser.next().await {
        match frame {
            Ok(frame) => match session_key.entschluesseln(&frame) {
                Ok(klartext) => bei_nachricht(klartext),
                Err(e) => tracing::warn!(fehler = %e, "Frame nicht entschluesselbar, verworfen"),
            },
            Err(e) => {
                tracing::warn!(fehler = %e, "Frame-Lesefehler");
                break;
            }
        }
    }
    tracing::debug!("Empfang beendet");
}

// ---------------------------------------------------------------------------
// ChatHandle
// ---------------------------------------------------------------------------

/// Handle auf eine zugelassene Sitzung
pub struct ChatHandle {
    benutzername: String,
    session_key: SessionKey,
    schreiber: Schreiber,
    empfang_task: JoinHandle<()>,
}

impl ChatHandle {
    pub fn benutzername(&self) -> &str {
        &self.benutzername
    }

    /// Schreibt den erhaltenen Sitzungsschluessel nach `verzeichnis`
    ///
    /// Schluessel und IV landen als rohe Bytes in `secret_key` und `iv`.
    /// Das Verzeichnis wird bei Bedarf angelegt.
    pub fn sitzung_speichern(&self, verzeichnis: impl AsRef<Path>) -> ClientResult<()> {
        let verzeichnis = verzeichnis.as_ref();
        std::fs::create_dir_all(verzeichnis)?;
        key_files::session_key_schreiben(
            &self.session_key,
            verzeichnis.join(SITZUNG_SCHLUESSEL_DATEI),
            verzeichnis.join(SITZUNG_IV_DATEI),
        )?;
        tracing::debug!(verzeichnis = %verzeichnis.display(), "Sitzungsschluessel gespeichert");
        Ok(())
    }

    /// `false` sobald der Server die Verbindung geschlossen hat
    pub fn ist_verbunden(&self) -> bool {
        !self.empfang_task.is_finished()
    }

    /// Sendet eine Chat-Zeile als `"<benutzername>: <text>"`
    pub async fn senden(&mut self, text: &str) -> ClientResult<()> {
        let zeile = format!("{}: {}", self.benutzername, text);
        self.verschluesselt_senden(&zeile).await
    }

    /// Verlaesst den Chat
    ///
    /// Sendet zuerst eine Abschiedsnachricht an alle, dann den
    /// Trenn-Sentinel, und wartet bis der Server die Verbindung schliesst.
    pub async fn verlassen(mut self) -> ClientResult<()> {
        let abschied = format!("{} {}", self.benutzername, ABSCHIEDS_SUFFIX);
        self.verschluesselt_senden(&abschied).await?;
        self.verschluesselt_senden(TRENN_SENTINEL).await?;
        SinkExt::<String>::close(&mut self.schreiber).await?;

        if tokio::time::timeout(ABSCHIED_TIMEOUT, &mut self.empfang_task)
            .await
            .is_err()
        {
            tracing::warn!("Server hat die Verbindung nach dem Verlassen nicht geschlossen");
        }
        tracing::info!(benutzer = %self.benutzername, "Chat verlassen");
        Ok(())
    }

    async fn verschluesselt_senden(&mut self, klartext: &str) -> ClientResult<()> {
        if !self.ist_verbunden() {
            return Err(ClientError::VerbindungGetrennt);
        }
        let chiffrat = self.session_key.verschluesseln(klartext)?;
        self.schreiber.send(chiffrat).await?;
        Ok(())
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        self.empfang_task.abort();
    }
}

impl std::fmt::Debug for ChatHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatHandle")
            .field("benutzername", &self.benutzername)
            .field("verbunden", &self.ist_verbunden())
            .finish_non_exhaustive()
    }
}
