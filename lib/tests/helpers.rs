// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::str::FromStr;

use log::LevelFilter;
use simplelog::SimpleLogger;

use phantom_link::{BridgeConfig, PhantomBridge};
use phantom_link_sim::PhantomSim;

pub const APP_URL: &str = "https://app.example";

pub const APP_SCHEME: &str = "testapp://";

/// Setup logging, level from `LOG_LEVEL`
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Default test configuration, with a timeout so lost replies fail tests
pub fn config() -> BridgeConfig {
    BridgeConfig::new(APP_URL, APP_SCHEME).with_request_timeout_s(Some(5))
}

/// Setup a bridge attached to a wallet simulator
pub fn setup(cfg: BridgeConfig) -> (PhantomBridge<PhantomSim>, PhantomSim) {
    setup_logging();

    let sim = PhantomSim::new();
    let b = PhantomBridge::new(cfg, sim.clone());

    sim.attach(b.activations());

    (b, sim)
}

/// Methods requested of the simulator, in order
#[allow(unused)]
pub fn methods(sim: &PhantomSim) -> Vec<String> {
    sim.requests().into_iter().map(|r| r.method).collect()
}
