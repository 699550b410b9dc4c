// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::io::BufRead;

use clap::Parser;
use log::{debug, info, warn, LevelFilter};

use phantom_link_proto::PeerErrorCode;
use phantom_link_sim::*;

/// Phantom wallet simulator tool
///
/// This reads request links from stdin (one per line) and writes
/// reply links to stdout, for use with `phantom-link-cli --opener print`
/// via a pair of pipes.
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Args {
    /// Reject all requests with the provided wallet error code
    #[clap(long)]
    reject: Option<i32>,

    /// Record requests without replying
    #[clap(long, conflicts_with = "reject")]
    drop: bool,

    /// Log level
    #[clap(long, default_value = "debug")]
    log_level: LevelFilter,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging, stdout is reserved for reply links
    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let sim = PhantomSim::new();

    let mode = match (args.reject, args.drop) {
        (Some(c), _) => {
            let code = PeerErrorCode::try_from(c)
                .map_err(|_| anyhow::anyhow!("Unknown wallet error code: {}", c))?;
            Mode::Reject {
                code,
                message: code.to_string(),
            }
        }
        (None, true) => Mode::Drop,
        (None, false) => Mode::Approve,
    };

    info!("Wallet simulator ready (mode: {:?})", mode);
    info!("Wallet public key: {}", sim.wallet_public_key());

    sim.set_mode(mode);

    for l in std::io::stdin().lock().lines() {
        let l = l?;
        let l = l.trim();
        if l.is_empty() {
            continue;
        }

        match sim.respond(l) {
            Ok(Some(reply)) => println!("{reply}"),
            Ok(None) => debug!("No reply"),
            Err(e) => warn!("Invalid request: {}", e),
        }
    }

    Ok(())
}
