//! Trust database CLI commands.

use anyhow::Result;
use clap::Subcommand;
use feedlock_core::config::Config;
use feedlock_core::trust::{hint_for, FileTrustStore, Fingerprint, TrustStore};

#[derive(Subcommand, Debug)]
pub enum TrustCommand {
    /// List trusted key fingerprints
    List,

    /// Mark a key fingerprint as trusted
    Add {
        /// 40-hex-digit key fingerprint
        fingerprint: String,
    },
}

pub fn run(command: TrustCommand, config: &Config) -> Result<()> {
    let store = FileTrustStore::open(config.trust_store_path())?;

    match command {
        TrustCommand::List => {
            for fingerprint in store.trusted_keys() {
                println!("{}", fingerprint.pretty());
            }
        }
        TrustCommand::Add { fingerprint } => {
            let fingerprint = Fingerprint::new(&fingerprint)?;
            store.trust_key(&fingerprint)?;
            println!("Trusted {}", fingerprint.pretty());
            println!("  {}", hint_for(&fingerprint));
        }
    }
    Ok(())
}
