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

pub mod usb;
pub mod clock_encoder;
pub mod preferences;
pub mod local_clock;
pub mod service;
pub mod session;
pub mod session_manager;
pub mod usb_device_watch;
pub mod driver;

#[cfg(test)]
mod test_support;

pub use nusb::DeviceId;
pub use driver::{ClockSyncDriver, DriverConfig};
pub use session_manager::DeviceSessionManager;
pub use usb_device_watch::{run_usb_device_watch, UsbSessionManager};
pub use service::{spawn_service, ServiceHandle, StopHandle};
pub use preferences::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
