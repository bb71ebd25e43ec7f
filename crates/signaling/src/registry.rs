//! SessionRegistry – der Hub aller zugelassenen Mitglieder
//!
//! Die Registry verwaltet die Send-Queues aller zugelassenen Verbindungen
//! und verteilt jeden Broadcast-Frame an alle. Jede Queue wird von einem
//! eigenen Schreib-Task geleert, der als einziger auf den Stream des
//! Mitglieds schreibt.
//!
//! ## Reihenfolge
//! Alle Broadcasts laufen unter derselben Sperre. Jedes Mitglied erhaelt
//! Frames daher in der prozessweiten Aufrufreihenfolge von `broadcast`.
//!
//! ## Langsame Mitglieder
//! Ist die Queue eines Mitglieds voll oder geschlossen, wird es entfernt
//! und sein `entfernt`-Token ausgeloest. Der Handler des Mitglieds
//! schliesst daraufhin die Verbindung, auch wenn sein Schreib-Task noch
//! auf einem nicht lesenden Peer haengt. Andere Mitglieder werden davon
//! nicht aufgehalten.

use hinterzimmer_core::MemberId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Mitglied
pub const STANDARD_QUEUE_GROESSE: usize = 256;

/// Ein Frame wie er an alle Mitglieder geht (einmal alloziert, geteilt)
pub type BroadcastFrame = Arc<str>;

// ---------------------------------------------------------------------------
// MemberSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines zugelassenen Mitglieds
#[derive(Clone, Debug)]
struct MemberSender {
    member_id: MemberId,
    tx: mpsc::Sender<BroadcastFrame>,
    entfernt: CancellationToken,
}

impl MemberSender {
    /// Reiht einen Frame nicht-blockierend ein
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    fn senden(&self, frame: BroadcastFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(member = %self.member_id, "Send-Queue voll, Mitglied wird entfernt");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(member = %self.member_id, "Send-Queue geschlossen (Verbindung getrennt)");
                false
            }
        }
    }
}

/// Was ein Mitglied bei der Registrierung erhaelt
#[derive(Debug)]
pub struct Mitgliedschaft {
    /// Frames die an dieses Mitglied gehen
    pub frames: mpsc::Receiver<BroadcastFrame>,
    /// Wird ausgeloest sobald das Mitglied nicht mehr registriert ist
    pub entfernt: CancellationToken,
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Zentrale Registry aller zugelassenen Mitglieder
///
/// Thread-safe via Arc + Mutex. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    mitglieder: Mutex<HashMap<MemberId, MemberSender>>,
    queue_groesse: usize,
}

impl SessionRegistry {
    /// Erstellt eine leere Registry mit Standard-Queue-Groesse
    pub fn neu() -> Self {
        Self::mit_queue_groesse(STANDARD_QUEUE_GROESSE)
    }

    /// Erstellt eine leere Registry mit eigener Queue-Groesse pro Mitglied
    pub fn mit_queue_groesse(queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                mitglieder: Mutex::new(HashMap::new()),
                queue_groesse: queue_groesse.max(1),
            }),
        }
    }

    /// Registriert ein Mitglied und gibt seine Empfangs-Queue zurueck
    ///
    /// Nach der Rueckkehr erhaelt das Mitglied jeden spaeteren Broadcast.
    /// Eine erneute Registrierung derselben ID ersetzt die alte Queue und
    /// loest das Token der alten Mitgliedschaft aus.
    pub fn registrieren(&self, member_id: MemberId) -> Mitgliedschaft {
        let (tx, frames) = mpsc::channel(self.inner.queue_groesse);
        let entfernt = CancellationToken::new();
        let sender = MemberSender {
            member_id,
            tx,
            entfernt: entfernt.clone(),
        };

        let vorher = self.inner.mitglieder.lock().insert(member_id, sender);
        if let Some(vorher) = vorher {
            vorher.entfernt.cancel();
            tracing::warn!(member = %member_id, "Mitglied war bereits registriert, Queue ersetzt");
        }
        tracing::debug!(member = %member_id, "Mitglied registriert");
        Mitgliedschaft { frames, entfernt }
    }

    /// Entfernt ein Mitglied
    ///
    /// Idempotent: gibt `true` zurueck wenn das Mitglied registriert war.
    pub fn abmelden(&self, member_id: &MemberId) -> bool {
        let Some(sender) = self.inner.mitglieder.lock().remove(member_id) else {
            return false;
        };
        sender.entfernt.cancel();
        tracing::debug!(member = %member_id, "Mitglied abgemeldet");
        true
    }

    /// Sendet einen Frame an alle registrierten Mitglieder (inkl. Absender)
    ///
    /// Gibt die Anzahl der erfolgreich eingereihten Frames zurueck. Mitglieder
    /// deren Queue voll oder geschlossen ist, werden entfernt.
    pub fn broadcast(&self, frame: &str) -> usize {
        let mut mitglieder = self.inner.mitglieder.lock();
        verteilen(&mut mitglieder, Arc::from(frame))
    }

    /// Wie `broadcast`, aber nur wenn `absender` noch registriert ist
    ///
    /// Pruefung und Verteilung laufen unter derselben Sperre. Gibt `None`
    /// zurueck wenn der Absender bereits entfernt wurde.
    pub fn broadcast_von(&self, absender: &MemberId, frame: &str) -> Option<usize> {
        let mut mitglieder = self.inner.mitglieder.lock();
        if !mitglieder.contains_key(absender) {
            return None;
        }
        Some(verteilen(&mut mitglieder, Arc::from(frame)))
    }

    /// Gibt die Anzahl der registrierten Mitglieder zurueck
    pub fn anzahl(&self) -> usize {
        self.inner.mitglieder.lock().len()
    }

    /// Prueft ob ein Mitglied registriert ist
    pub fn ist_registriert(&self, member_id: &MemberId) -> bool {
        self.inner.mitglieder.lock().contains_key(member_id)
    }

    /// Gibt die IDs aller registrierten Mitglieder zurueck
    pub fn mitglieder(&self) -> Vec<MemberId> {
        self.inner.mitglieder.lock().keys().copied().collect()
    }
}

/// Reiht `frame` bei allen Mitgliedern ein und entfernt die, bei denen das
/// nicht gelingt
fn verteilen(mitglieder: &mut HashMap<MemberId, MemberSender>, frame: BroadcastFrame) -> usize {
    let mut gesendet = 0;
    let mut entfernen = Vec::new();
    for (member_id, sender) in mitglieder.iter() {
        if sender.senden(Arc::clone(&frame)) {
            gesendet += 1;
        } else {
            entfernen.push(*member_id);
        }
    }
    for member_id in &entfernen {
        if let Some(sender) = mitglieder.remove(member_id) {
            sender.entfernt.cancel();
        }
    }

    if !entfernen.is_empty() {
        tracing::info!(entfernt = entfernen.len(), "Mitglieder beim Broadcast entfernt");
    }
    gesendet
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("mitglieder", &self.anzahl())
            .field("queue_groesse", &self.inner.queue_groesse)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registrieren_und_broadcast() {
        let registry = SessionRegistry::neu();
        let id = MemberId::new();

        let mut rx = registry.registrieren(id).frames;
        assert!(registry.ist_registriert(&id));

        assert_eq!(registry.broadcast("frame"), 1);
        assert_eq!(&*rx.try_recv().unwrap(), "frame");
    }

    #[tokio::test]
    async fn broadcast_erreicht_alle_mitglieder() {
        let registry = SessionRegistry::neu();
        let mut receivers: Vec<_> = (0..5).map(|_| registry.registrieren(MemberId::new()).frames).collect();

        assert_eq!(registry.broadcast("an alle"), 5);
        for rx in &mut receivers {
            assert_eq!(&*rx.try_recv().unwrap(), "an alle");
            assert!(rx.try_recv().is_err(), "genau ein Frame pro Mitglied");
        }
    }

    #[test]
    fn abmelden_ist_idempotent() {
        let registry = SessionRegistry::neu();
        let id = MemberId::new();
        let andere = MemberId::new();
        let _rx = registry.registrieren(id);
        let _rx2 = registry.registrieren(andere);

        assert!(registry.abmelden(&id));
        assert!(!registry.abmelden(&id));
        assert!(!registry.ist_registriert(&id));
        assert_eq!(registry.mitglieder(), vec![andere]);
    }

    #[test]
    fn abmelden_eines_unbekannten_mitglieds() {
        let registry = SessionRegistry::neu();
        assert!(!registry.abmelden(&MemberId::new()));
        assert_eq!(registry.anzahl(), 0);
    }

    #[test]
    fn geschlossene_queue_wird_entfernt() {
        let registry = SessionRegistry::neu();
        let tot = MemberId::new();
        let lebendig = MemberId::new();

        drop(registry.registrieren(tot));
        let mut rx = registry.registrieren(lebendig).frames;

        assert_eq!(registry.broadcast("x"), 1);
        assert!(!registry.ist_registriert(&tot));
        assert!(registry.ist_registriert(&lebendig));
        assert_eq!(&*rx.try_recv().unwrap(), "x");
    }

    #[test]
    fn volle_queue_wird_entfernt_ohne_andere_aufzuhalten() {
        let registry = SessionRegistry::mit_queue_groesse(2);
        let langsam = MemberId::new();
        let schnell = MemberId::new();

        let langsam_mitgliedschaft = registry.registrieren(langsam);
        let mut rx_schnell = registry.registrieren(schnell).frames;

        for i in 0..2 {
            assert_eq!(registry.broadcast(&format!("f{i}")), 2);
            rx_schnell.try_recv().unwrap();
        }
        // Dritter Frame passt nicht mehr in die Queue des langsamen Mitglieds
        assert!(!langsam_mitgliedschaft.entfernt.is_cancelled());
        assert_eq!(registry.broadcast("f2"), 1);
        assert!(!registry.ist_registriert(&langsam));
        assert!(langsam_mitgliedschaft.entfernt.is_cancelled());
        assert_eq!(&*rx_schnell.try_recv().unwrap(), "f2");
    }

    #[test]
    fn abmelden_loest_entfernt_aus() {
        let registry = SessionRegistry::neu();
        let id = MemberId::new();
        let mitgliedschaft = registry.registrieren(id);

        assert!(!mitgliedschaft.entfernt.is_cancelled());
        registry.abmelden(&id);
        assert!(mitgliedschaft.entfernt.is_cancelled());
    }

    #[test]
    fn broadcast_von_entferntem_absender_wird_verworfen() {
        let registry = SessionRegistry::mit_queue_groesse(1);
        let langsam = MemberId::new();
        let schnell = MemberId::new();
        let _langsam = registry.registrieren(langsam);
        let mut rx_schnell = registry.registrieren(schnell).frames;

        assert_eq!(registry.broadcast_von(&langsam, "a"), Some(2));
        rx_schnell.try_recv().unwrap();
        // Queue des langsamen Mitglieds ist voll, es wird entfernt
        assert_eq!(registry.broadcast_von(&schnell, "b"), Some(1));
        rx_schnell.try_recv().unwrap();

        assert_eq!(registry.broadcast_von(&langsam, "c"), None);
        assert!(rx_schnell.try_recv().is_err());
    }

    #[test]
    fn reihenfolge_bleibt_erhalten() {
        let registry = SessionRegistry::neu();
        let mut a = registry.registrieren(MemberId::new()).frames;
        let mut b = registry.registrieren(MemberId::new()).frames;

        for i in 0..10 {
            registry.broadcast(&i.to_string());
        }
        for rx in [&mut a, &mut b] {
            let empfangen: Vec<String> = (0..10).map(|_| rx.try_recv().unwrap().to_string()).collect();
            let erwartet: Vec<String> = (0..10).map(|i| i.to_string()).collect();
            assert_eq!(empfangen, erwartet);
        }
    }

    #[test]
    fn gleichzeitige_broadcasts_in_gleicher_reihenfolge() {
        let registry = SessionRegistry::mit_queue_groesse(1024);
        let mut a = registry.registrieren(MemberId::new()).frames;
        let mut b = registry.registrieren(MemberId::new()).frames;

        let threads: Vec<_> = (0..4)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.broadcast(&format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let alle = |rx: &mut mpsc::Receiver<BroadcastFrame>| {
            let mut frames = Vec::new();
            while let Ok(frame) = rx.try_recv() {
                frames.push(frame.to_string());
            }
            frames
        };
        let frames_a = alle(&mut a);
        assert_eq!(frames_a.len(), 200);
        assert_eq!(frames_a, alle(&mut b));
    }
}
