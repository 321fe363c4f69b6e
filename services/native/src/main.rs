// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

mod cli;

use std::sync::Arc;
use anyhow::Context;
use clap::Parser;
use log::{debug, info};
use x52_clock_core::preferences::{
    ClockMode, DateFieldOrder, PreferenceStore, DEFAULT_CLOCK_TYPE, DEFAULT_DATE_FORMAT,
    PROPERTY_CLOCK_TYPE, PROPERTY_DATE_FORMAT,
};
use x52_clock_core::usb::definitions::DeviceMatcher;
use x52_clock_core::{ClockSyncDriver, DriverConfig, JsonFilePreferenceStore};
use crate::cli::{Cli, Commands, LogLevel, PreferenceCommands};

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(log_level.to_level_filter())
        .parse_default_env()
        .init();
    debug!("Logger initialized with level: {}", log_level.to_level_filter());
}

async fn run_daemon(config: DriverConfig, preferences: JsonFilePreferenceStore) -> anyhow::Result<()> {
    info!("Reading preferences from {}", preferences.path().display());
    let driver = ClockSyncDriver::new(config, Arc::new(preferences));
    let _device_watch = driver.run().context("Failed to start USB device watch")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C signal")?;
    info!("Interrupted, exiting.");
    std::process::exit(0);
}

fn show_preferences(preferences: &JsonFilePreferenceStore) {
    let date_format = preferences.read_or_default(PROPERTY_DATE_FORMAT, DEFAULT_DATE_FORMAT);
    let clock_type = preferences.read_or_default(PROPERTY_CLOCK_TYPE, DEFAULT_CLOCK_TYPE);
    println!("Preferences file: {}", preferences.path().display());
    println!("{}: {} -> {:?}", PROPERTY_DATE_FORMAT, date_format, DateFieldOrder::from_preference(&date_format).fields());
    println!("{}: {} -> {:?}", PROPERTY_CLOCK_TYPE, clock_type, ClockMode::from_preference(&clock_type));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let preferences = match cli.preferences {
        Some(path) => JsonFilePreferenceStore::new(path),
        None => JsonFilePreferenceStore::in_default_location(),
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let config = DriverConfig {
                matcher: DeviceMatcher::new(cli.vendor_id, cli.product_id),
                update_period: cli.update_period,
            };
            run_daemon(config, preferences).await
        }
        Commands::Preferences { command: PreferenceCommands::Show } => {
            show_preferences(&preferences);
            Ok(())
        }
        Commands::Preferences { command: PreferenceCommands::Set { key, value } } => {
            preferences.write(key.property_name(), &value)
                .with_context(|| format!("Failed to write {}", preferences.path().display()))?;
            info!("{} set to {:?} in {}", key.property_name(), value, preferences.path().display());
            Ok(())
        }
    }
}
