//! hinterzimmer-admin – Schluessel und Whitelist verwalten

use anyhow::Result;
use clap::{Parser, Subcommand};
use hinterzimmer_auth::credential_hashen;
use hinterzimmer_crypto::asymmetric::STANDARD_RSA_BITS;
use hinterzimmer_server::admin;
use std::path::PathBuf;

/// Verwaltungswerkzeug fuer einen Hinterzimmer-Server
#[derive(Parser)]
#[command(name = "hinterzimmer-admin")]
#[command(version)]
#[command(about = "Schluessel und Whitelist fuer Hinterzimmer verwalten")]
struct Cli {
    #[command(subcommand)]
    befehl: Befehl,
}

#[derive(Subcommand)]
enum Befehl {
    /// Erzeugt ein RSA-Schluesselpaar (X.509 DER / PKCS#8 DER)
    Keygen {
        /// Ziel fuer den oeffentlichen Schluessel
        #[arg(long, default_value = "ServerDocuments/server_public.key")]
        oeffentlich: PathBuf,

        /// Ziel fuer den privaten Schluessel
        #[arg(long, default_value = "ServerDocuments/server_private.key")]
        privat: PathBuf,

        /// Modulus-Groesse in Bit
        #[arg(long, default_value_t = STANDARD_RSA_BITS)]
        bits: usize,
    },

    /// Traegt einen Benutzer in die Whitelist ein
    WhitelistAdd {
        /// Whitelist-Datei
        #[arg(long, default_value = "Documents/whitelist.txt")]
        whitelist: PathBuf,

        /// Benutzername (Klartext, wird gehasht)
        #[arg(short, long)]
        benutzer: String,

        /// Passwort (Klartext, wird gehasht)
        #[arg(short, long, env = "HZ_PASSWORT", hide_env_values = true)]
        passwort: String,
    },

    /// Gibt den Hash eines Textes aus, wie er in der Whitelist steht
    Hash {
        /// Zu hashender Text
        text: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    hinterzimmer_observability::logging_initialisieren("info", "text")?;

    match cli.befehl {
        Befehl::Keygen {
            oeffentlich,
            privat,
            bits,
        } => {
            admin::schluessel_erzeugen(bits, &oeffentlich, &privat)?;
            println!("{}", oeffentlich.display());
            println!("{}", privat.display());
        }
        Befehl::WhitelistAdd {
            whitelist,
            benutzer,
            passwort,
        } => {
            admin::whitelist_ergaenzen(&whitelist, &benutzer, &passwort)?;
            println!("'{benutzer}' eingetragen in {}", whitelist.display());
        }
        Befehl::Hash { text } => println!("{}", credential_hashen(&text)),
    }
    Ok(())
}
