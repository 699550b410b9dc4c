// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for requesting Phantom wallet operations via deep links
//!
//! Request links are printed (or opened with the platform handler), reply
//! links are read from stdin one per line.

use clap::Parser;
use log::{debug, info, LevelFilter};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use phantom_link::{
    proto::{payload::SendOptions, Commitment, DisplayEncoding},
    BridgeConfig, GenericOpener, Opener, OpenerKind, PhantomBridge,
};

mod helpers;
use helpers::*;

/// Phantom deep-link command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    #[clap(flatten)]
    bridge: BridgeConfig,

    /// Link opener for wallet requests
    #[clap(long, value_enum, default_value = "print")]
    opener: OpenerKind,

    /// Disconnect from the wallet once the command completes
    #[clap(long)]
    disconnect: bool,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, clap::Subcommand)]
#[non_exhaustive]
enum Actions {
    /// Connect and fetch the wallet public key
    Connect,

    /// Sign a message
    SignMessage {
        /// Message to be signed
        message: String,

        /// Display hint for the wallet
        #[clap(long)]
        display: Option<DisplayEncoding>,
    },

    /// Sign a serialized transaction, returning the signed transaction
    SignTransaction {
        /// Hex encoded serialized transaction
        transaction: HexData,
    },

    /// Sign and submit a serialized transaction, returning the signature
    SignAndSendTransaction {
        /// Hex encoded serialized transaction
        transaction: HexData,

        /// Maximum number of submission retries
        #[clap(long)]
        max_retries: Option<u32>,

        /// Commitment level for preflight checks
        #[clap(long)]
        preflight_commitment: Option<Commitment>,

        /// Skip preflight checks
        #[clap(long)]
        skip_preflight: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging, stdout is reserved for request links
    TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    debug!("Using opener: {}", args.opener);

    // Setup bridge
    let mut b = PhantomBridge::new(args.bridge.clone(), GenericOpener::from(args.opener));

    // Deliver reply links from stdin
    let a = b.activations();
    std::thread::spawn(move || {
        if let Err(e) = read_activations(a) {
            log::error!("Failed to read reply links: {}", e);
        }
    });

    // Connect to the wallet
    let wallet = b.connect().await?;
    info!("wallet public key: {}", wallet);

    // Execute command
    execute(&mut b, args.cmd).await?;

    if args.disconnect {
        b.disconnect().await?;
        info!("disconnected");
    }

    Ok(())
}

/// Execute a command with a connected bridge
async fn execute<O: Opener>(b: &mut PhantomBridge<O>, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Connect => (),
        Actions::SignMessage { message, display } => {
            info!("requesting signature for message: '{}'", message);

            let signature = match display {
                Some(d) => b.sign_message_bytes(message.as_bytes(), Some(d)).await?,
                None => b.sign_message(&message).await?,
            };

            info!("signature: {}", signature);
        }
        Actions::SignTransaction { transaction } => {
            info!("requesting signature for transaction: {}", transaction);

            let signed = b.sign_transaction(transaction.as_ref()).await?;

            info!("signed transaction: {}", hex::encode(signed));
        }
        Actions::SignAndSendTransaction {
            transaction,
            max_retries,
            preflight_commitment,
            skip_preflight,
        } => {
            info!("requesting submission of transaction: {}", transaction);

            let opts = SendOptions {
                max_retries,
                preflight_commitment,
                skip_preflight: skip_preflight.then_some(true),
            };

            let signature = b
                .sign_and_send_transaction(transaction.as_ref(), Some(opts))
                .await?;

            info!("transaction signature: {}", signature);
        }
    }

    Ok(())
}
