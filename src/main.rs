use std::process::ExitCode;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::error;
use crate::config::Config;
use crate::initialization::init;
use crate::manager_octopus::Octopus;
use crate::worker::{create_sinks, run};

mod config;
mod cost;
mod dump;
mod errors;
mod initialization;
mod logging;
mod manager_influx;
mod manager_octopus;
mod models;
mod rates;
mod records;
mod sink;
mod tariff;
mod worker;

fn main() -> ExitCode {
    let (config, from, to) = match init() {
        Ok(init) => init,
        Err(e) => {
            eprintln!("Error initializing octograph: {:?}", e);
            return ExitCode::FAILURE;
        }
    };

    match process(&config, from, to) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn process(config: &Config, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<()> {
    let octopus = Octopus::new(&config.octopus);
    let sinks = create_sinks(config);

    run(config, &octopus, &sinks, from, to)?;

    Ok(())
}
