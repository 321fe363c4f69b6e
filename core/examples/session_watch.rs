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

use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use log::info;
use x52_clock_core::preferences::{PROPERTY_CLOCK_TYPE, PROPERTY_DATE_FORMAT};
use x52_clock_core::{ClockSyncDriver, DriverConfig, MemoryPreferenceStore};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    info!("Starting session watch example");

    let preferences = Arc::new(MemoryPreferenceStore::with_values([
        (PROPERTY_DATE_FORMAT, "mmddyy"),
        (PROPERTY_CLOCK_TYPE, "12"),
    ]));
    let driver = ClockSyncDriver::new(DriverConfig::default(), preferences.clone());
    let watch_handle = driver.run()?;

    tokio::time::sleep(Duration::from_secs(2)).await;
    info!("Managing {} device(s)", driver.device_manager().session_count());

    info!("Switching to 24 hour clock for 5 seconds...");
    preferences.set(PROPERTY_CLOCK_TYPE, "24");
    tokio::time::sleep(Duration::from_secs(5)).await;

    info!("Shutting down USB device watch");
    watch_handle.shutdown().await?;
    info!("Example completed successfully");
    Ok(())
}
