//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `RelayServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einem
//! `ConnectionHandler`.
//!
//! ## Shutdown
//! Das Shutdown-Signal beendet nur die Accept-Loop. Bestehende
//! Verbindungen laufen weiter, bis ihre Sockets geschlossen werden.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};

use crate::connection::ConnectionHandler;
use crate::server_state::SignalingState;

/// TCP-Relay-Server
///
/// Akzeptiert Verbindungen in einer Loop. Mehr als `max_mitglieder`
/// gleichzeitige Verbindungen werden sofort wieder geschlossen.
pub struct RelayServer {
    state: Arc<SignalingState>,
    listener: TcpListener,
    plaetze: Arc<Semaphore>,
}

impl RelayServer {
    /// Bindet den TCP-Socket
    pub async fn binden(state: Arc<SignalingState>, bind_addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind_addr).await?;
        Ok(Self::mit_listener(state, listener))
    }

    /// Verwendet einen bereits gebundenen Listener
    pub fn mit_listener(state: Arc<SignalingState>, listener: TcpListener) -> Self {
        // `SignalingConfig::pruefen` lehnt groessere Werte ab; `neu` prueft nicht
        let plaetze = Arc::new(Semaphore::new(
            state.config.max_mitglieder.min(Semaphore::MAX_PERMITS),
        ));
        Self {
            state,
            listener,
            plaetze,
        }
    }

    /// Gibt die tatsaechlich gebundene Adresse zurueck
    pub fn lokale_adresse(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Akzeptiert Verbindungen bis `shutdown_rx` ein `true`-Signal empfaengt
    pub async fn starten(self, mut shutdown_rx: watch::Receiver<bool>) -> std::io::Result<()> {
        let lokale_addr = self.listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "Relay-Server gestartet");

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let Ok(platz) = Arc::clone(&self.plaetze).try_acquire_owned() else {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.state.config.max_mitglieder,
                                    "Server voll, Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            };

                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::debug!(peer = %peer_addr, fehler = %e, "TCP_NODELAY nicht gesetzt");
                            }

                            let handler = ConnectionHandler::neu(Arc::clone(&self.state), peer_addr);
                            tokio::spawn(async move {
                                handler.verarbeiten(stream).await;
                                drop(platz);
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Relay-Server: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("Relay-Server gestoppt");
        Ok(())
    }
}
