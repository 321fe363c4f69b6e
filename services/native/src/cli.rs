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

use std::path::PathBuf;
use std::time::Duration;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use x52_clock_core::preferences::{PROPERTY_CLOCK_TYPE, PROPERTY_DATE_FORMAT};
use x52_clock_core::usb::definitions::{X52_PRO_PRODUCT_ID, X52_PRO_VENDOR_ID};

/// Verbosity of the daemon's log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PreferenceKey {
    /// Order of the date fields, e.g. ddmmyy or mmddyy
    DateFormat,
    /// 12 or 24 hour clock
    ClockType,
}

impl PreferenceKey {
    pub fn property_name(&self) -> &'static str {
        match self {
            PreferenceKey::DateFormat => PROPERTY_DATE_FORMAT,
            PreferenceKey::ClockType => PROPERTY_CLOCK_TYPE,
        }
    }
}

/// Parses a 16-bit USB identifier given in hex (`0x06a3`) or decimal.
pub fn parse_usb_id(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("Invalid USB identifier {:?}: {}", s, e))
}

fn parse_period_ms(s: &str) -> Result<Duration, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("Update period must be greater than zero".to_string()),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(format!("Invalid update period {:?}: {}", s, e)),
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Preferences file, defaults to preferences.json in the configuration directory
    #[arg(short, long)]
    pub preferences: Option<PathBuf>,

    /// USB vendor identifier of the device
    #[arg(long, value_parser = parse_usb_id, default_value_t = X52_PRO_VENDOR_ID)]
    pub vendor_id: u16,

    /// USB product identifier of the device
    #[arg(long, value_parser = parse_usb_id, default_value_t = X52_PRO_PRODUCT_ID)]
    pub product_id: u16,

    /// Period of the clock updates in milliseconds
    #[arg(long = "update-period-ms", value_parser = parse_period_ms, default_value = "1000")]
    pub update_period: Duration,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Keep attached devices in sync (default)
    Run,

    /// Preference management commands
    Preferences {
        #[command(subcommand)]
        command: PreferenceCommands,
    },
}

#[derive(Subcommand)]
pub enum PreferenceCommands {
    /// Print the effective preferences
    Show,

    /// Store a preference value
    Set {
        #[arg(value_enum)]
        key: PreferenceKey,

        value: String,
    },
}
