//! Gemeinsame Hilfen fuer die Integration-Tests

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use hinterzimmer_auth::{credential_hashen, CredentialStore};
use hinterzimmer_crypto::{asymmetric, AsymmetricKeyPair, SessionKey};
use hinterzimmer_protocol::{Anmeldedaten, FrameCodec, HandshakeAntwort, HandshakeRequest};
use hinterzimmer_signaling::{SignalingConfig, SignalingState};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

/// Maximale Wartezeit auf erwartete Frames
pub const WARTEZEIT: Duration = Duration::from_secs(5);

/// Wartezeit fuer "es kommt nichts"
pub const STILLE: Duration = Duration::from_millis(200);

pub fn server_schluessel() -> &'static AsymmetricKeyPair {
    static PAAR: OnceLock<AsymmetricKeyPair> = OnceLock::new();
    PAAR.get_or_init(|| AsymmetricKeyPair::generieren(2048).unwrap())
}

pub fn client_schluessel() -> &'static AsymmetricKeyPair {
    static PAAR: OnceLock<AsymmetricKeyPair> = OnceLock::new();
    PAAR.get_or_init(|| AsymmetricKeyPair::generieren(1024).unwrap())
}

pub fn test_whitelist() -> CredentialStore {
    let text = format!(
        "{} {}\n{} {}\n",
        credential_hashen("alice"),
        credential_hashen("secret"),
        credential_hashen("bob"),
        credential_hashen("hunter2"),
    );
    CredentialStore::aus_text(&text).unwrap()
}

pub fn test_state_mit(config: SignalingConfig) -> Arc<SignalingState> {
    SignalingState::neu(
        config,
        Arc::new(test_whitelist()),
        server_schluessel().clone(),
        SessionKey::generieren().unwrap(),
    )
}

pub fn test_state() -> Arc<SignalingState> {
    test_state_mit(SignalingConfig::default())
}

/// Wartet bis `bedingung` erfuellt ist oder `WARTEZEIT` ablaeuft
pub async fn warten_bis(bedingung: impl Fn() -> bool) -> bool {
    let ende = tokio::time::Instant::now() + WARTEZEIT;
    while tokio::time::Instant::now() < ende {
        if bedingung() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bedingung()
}

/// Minimaler Client, der das Protokoll von Hand spricht
pub struct TestClient<S> {
    pub framed: Framed<S, FrameCodec>,
}

impl<S> TestClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn neu(stream: S) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec::new()),
        }
    }

    pub fn handshake_frame(benutzer: &str, passwort: &str) -> String {
        let daten = Anmeldedaten::neu(credential_hashen(benutzer), credential_hashen(passwort));
        let chiffrat =
            asymmetric::verschluesseln(&daten.to_klartext(), server_schluessel().oeffentlich())
                .unwrap();
        HandshakeRequest {
            anmeldedaten_chiffrat: chiffrat,
            client_public_key: asymmetric::public_key_zu_base64(client_schluessel().oeffentlich())
                .unwrap(),
        }
        .to_frame()
    }

    /// Sendet den Handshake und entschluesselt die Antwort
    pub async fn anmelden(&mut self, benutzer: &str, passwort: &str) -> HandshakeAntwort {
        self.senden(&Self::handshake_frame(benutzer, passwort)).await;
        let antwort = self.naechster_frame().await.expect("Handshake-Antwort erwartet");
        let klartext = client_schluessel().entschluesseln(&antwort).unwrap();
        HandshakeAntwort::aus_klartext(&klartext)
    }

    /// Meldet sich an und gibt den erhaltenen Sitzungsschluessel zurueck
    pub async fn zulassen(&mut self, benutzer: &str, passwort: &str) -> SessionKey {
        match self.anmelden(benutzer, passwort).await {
            HandshakeAntwort::Zugelassen(nutzlast) => SessionKey::dekodieren(&nutzlast).unwrap(),
            HandshakeAntwort::Abgelehnt => panic!("{benutzer} wurde abgelehnt"),
        }
    }

    pub async fn senden(&mut self, frame: &str) {
        self.framed.send(frame).await.unwrap();
    }

    /// Verschluesselt und sendet; gibt das gesendete Chiffrat zurueck
    pub async fn klartext_senden(&mut self, key: &SessionKey, text: &str) -> String {
        let chiffrat = key.verschluesseln(text).unwrap();
        self.senden(&chiffrat).await;
        chiffrat
    }

    /// Naechster Frame; `None` wenn die Verbindung geschlossen wurde
    pub async fn naechster_frame(&mut self) -> Option<String> {
        tokio::time::timeout(WARTEZEIT, self.framed.next())
            .await
            .expect("Zeitueberschreitung beim Warten auf Frame")
            .and_then(Result::ok)
    }

    /// Prueft dass innerhalb von `STILLE` kein Frame eintrifft
    pub async fn nichts_empfangen(&mut self) -> bool {
        tokio::time::timeout(STILLE, self.framed.next()).await.is_err()
    }
}
