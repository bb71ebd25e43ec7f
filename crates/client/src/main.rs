//! hinterzimmer-chat – Terminal-Client
//!
//! Liest Zeilen von stdin und sendet sie in den Chat. Empfangene
//! Nachrichten erscheinen auf stdout. `/quit` oder Ende von stdin
//! verlaesst den Chat.

use anyhow::{bail, Context, Result};
use clap::Parser;
use hinterzimmer_client::{verbinden, ClientIdentitaet, ConnectOutcome};
use hinterzimmer_crypto::{asymmetric::STANDARD_RSA_BITS, key_files, AsymmetricKeyPair};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Terminal-Client fuer einen Hinterzimmer-Server
#[derive(Parser, Debug)]
#[command(name = "hinterzimmer-chat")]
#[command(version)]
#[command(about = "Terminal-Client fuer Hinterzimmer")]
struct Cli {
    /// Server-Adresse
    #[arg(short, long, default_value = "127.0.0.1:12000")]
    server: String,

    /// Benutzername
    #[arg(short, long)]
    benutzer: String,

    /// Passwort (alternativ ueber HZ_PASSWORT)
    #[arg(short, long, env = "HZ_PASSWORT", hide_env_values = true)]
    passwort: String,

    /// Oeffentlicher Schluessel des Servers (X.509 DER)
    #[arg(long, default_value = "ClientDocuments/server_public.key")]
    server_key: PathBuf,

    /// Eigener privater Schluessel (PKCS#8 DER); fehlt die Datei, wird
    /// fuer diesen Lauf ein neues Paar erzeugt
    #[arg(long, default_value = "ClientDocuments/private.key")]
    privat_key: PathBuf,

    /// Erhaltenen Sitzungsschluessel in dieses Verzeichnis schreiben
    #[arg(long)]
    sitzung_speichern: Option<PathBuf>,

    /// Log-Filter
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    hinterzimmer_observability::logging_initialisieren(&cli.log_level, "text")?;

    let server_key = key_files::public_key_lesen(&cli.server_key).with_context(|| {
        format!("Server-Schluessel '{}' nicht lesbar", cli.server_key.display())
    })?;
    let schluessel = if cli.privat_key.exists() {
        key_files::schluesselpaar_lesen(&cli.privat_key).with_context(|| {
            format!("Privater Schluessel '{}' nicht lesbar", cli.privat_key.display())
        })?
    } else {
        tracing::info!("Kein privater Schluessel gefunden, erzeuge neues Paar");
        AsymmetricKeyPair::generieren(STANDARD_RSA_BITS)?
    };
    let identitaet = ClientIdentitaet {
        schluessel,
        server_key,
    };

    let ausgang = verbinden(
        cli.server.as_str(),
        &cli.benutzer,
        &cli.passwort,
        &identitaet,
        |nachricht| println!("{nachricht}"),
    )
    .await
    .with_context(|| format!("Verbindung zu {} fehlgeschlagen", cli.server))?;

    let mut handle = match ausgang {
        ConnectOutcome::Zugelassen(handle) => handle,
        ConnectOutcome::Abgelehnt(event) => {
            bail!("Ungueltige Anmeldedaten fuer '{}'", event.benutzername)
        }
    };

    if let Some(verzeichnis) = &cli.sitzung_speichern {
        handle
            .sitzung_speichern(verzeichnis)
            .with_context(|| format!("Sitzungsschluessel nicht in {} gespeichert", verzeichnis.display()))?;
    }

    eprintln!("Verbunden als {}. /quit zum Verlassen.", cli.benutzer);

    let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
    while let Some(zeile) = zeilen.next_line().await? {
        let zeile = zeile.trim();
        if zeile == "/quit" {
            break;
        }
        if zeile.is_empty() {
            continue;
        }
        if let Err(e) = handle.senden(zeile).await {
            bail!("Senden fehlgeschlagen: {e}");
        }
    }

    handle.verlassen().await?;
    Ok(())
}
