//! # Demo: a coffee house under load
//!
//! Opens a house, admits a few waves of guests and prints the status every
//! second until Ctrl-C.
//!
//! ```text
//! cargo run --example coffee_house --features logging [config.toml]
//! RUST_LOG=coffeehouse=debug cargo run --example coffee_house --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use coffeehouse::{Coffee, CoffeeHouse, HouseConfig, HouseStatus, LogWriter, Subscribe};
use tracing_subscriber::EnvFilter;

fn print_status(status: &HouseStatus) {
    println!(
        "[status] guests active={} exhausted={} faulted={} rejected={} consumed={} pool={}{}",
        status.active_guests,
        status.exhausted,
        status.faulted,
        status.rejected,
        status.total_consumed,
        status.pool_size,
        if status.shedding { " (shedding)" } else { "" },
    );
    for guest in status.guests.iter().filter(|g| g.consumed < g.limit) {
        println!(
            "         {} {} {}/{} {:?}",
            guest.name, guest.coffee, guest.consumed, guest.limit, guest.status
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => HouseConfig::load(path)?,
        None => {
            let mut cfg = HouseConfig::default();
            cfg.barista.accuracy = 80;
            cfg.barista.max_failures = 3;
            cfg
        }
    };

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let house = CoffeeHouse::builder(cfg).with_subscribers(subs).build()?;

    house.admit_default(3, Coffee::Akkaccino);
    house.admit(2, Coffee::CaffeJava, Some(5));
    house.admit(4, "mocha play".parse()?, None);

    let ticker = async {
        let mut every = tokio::time::interval(Duration::from_secs(1));
        loop {
            every.tick().await;
            match house.status().await {
                Ok(status) => print_status(&status),
                Err(e) => {
                    eprintln!("[status] {e}");
                    break;
                }
            }
        }
    };

    tokio::select! {
        res = house.run_until_signal() => res?,
        _ = ticker => {}
    }
    println!("[demo] closed");
    Ok(())
}
