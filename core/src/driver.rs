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
use anyhow::Error;
use log::info;
use crate::local_clock::{LocalClock, SystemLocalClock};
use crate::preferences::PreferenceStore;
use crate::service::ServiceHandle;
use crate::usb::definitions::DeviceMatcher;
use crate::usb_device_watch::{run_usb_device_watch, UsbSessionManager};

pub const DEFAULT_UPDATE_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// Identifiers of the devices to keep in sync.
    pub matcher: DeviceMatcher,
    /// Period of the clock updates of each device.
    pub update_period: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            matcher: DeviceMatcher::default(),
            update_period: DEFAULT_UPDATE_PERIOD,
        }
    }
}

/// Application context of the daemon: configuration, preference store and the session
/// manager, wired together at start-up.
pub struct ClockSyncDriver {
    config: DriverConfig,
    device_manager: Arc<UsbSessionManager>,
}

impl ClockSyncDriver {
    pub fn new(config: DriverConfig, preferences: Arc<dyn PreferenceStore>) -> Self {
        Self::with_clock(config, preferences, Arc::new(SystemLocalClock))
    }

    pub fn with_clock(config: DriverConfig,
                      preferences: Arc<dyn PreferenceStore>,
                      clock: Arc<dyn LocalClock>) -> Self {
        let device_manager = Arc::new(UsbSessionManager::new(preferences, clock, config.update_period));
        Self { config, device_manager }
    }

    pub fn config(&self) -> &DriverConfig { &self.config }

    pub fn device_manager(&self) -> Arc<UsbSessionManager> { self.device_manager.clone() }

    /// Starts watching the bus; must be called from within a Tokio runtime.
    pub fn run(&self) -> Result<ServiceHandle, Error> {
        info!("Watching for devices {:04X}:{:04X}, updating every {:?}",
              self.config.matcher.vendor_id,
              self.config.matcher.product_id,
              self.config.update_period);
        run_usb_device_watch(self.device_manager.clone(), self.config.matcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::MemoryPreferenceStore;
    use crate::usb::definitions::{X52_PRO_PRODUCT_ID, X52_PRO_VENDOR_ID};

    #[test]
    fn default_config_targets_x52_pro_every_second() {
        let config = DriverConfig::default();
        assert_eq!(config.matcher, DeviceMatcher::new(X52_PRO_VENDOR_ID, X52_PRO_PRODUCT_ID));
        assert_eq!(config.update_period, Duration::from_secs(1));
    }

    #[test]
    fn new_driver_starts_without_sessions() {
        let driver = ClockSyncDriver::new(DriverConfig::default(), Arc::new(MemoryPreferenceStore::new()));
        assert_eq!(driver.device_manager().session_count(), 0);
        assert_eq!(driver.config(), &DriverConfig::default());
    }
}
