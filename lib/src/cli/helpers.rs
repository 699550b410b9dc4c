// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::io::BufRead;

use log::{debug, warn};

use phantom_link::Activations;

/// Variable length hex encoded bytes
#[derive(Clone, PartialEq, Debug)]
pub struct HexData(pub Vec<u8>);

impl std::str::FromStr for HexData {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches("0x");

        hex::decode(s).map(HexData)
    }
}

impl AsRef<[u8]> for HexData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for HexData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Read reply links from stdin (one per line), delivering each as an activation
///
/// This blocks, and is run on a dedicated thread.
pub fn read_activations(a: Activations) -> anyhow::Result<()> {
    for l in std::io::stdin().lock().lines() {
        let l = l?;
        let l = l.trim();
        if l.is_empty() {
            continue;
        }

        match a.activate(l) {
            true => debug!("Accepted reply link"),
            false => warn!("Reply link did not match an outstanding request"),
        }
    }

    Ok(())
}
