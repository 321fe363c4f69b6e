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

use std::fmt::Debug;
use std::hash::Hash;
use async_trait::async_trait;
use nusb::{DeviceId, DeviceInfo};
use crate::usb::definitions::{ClockRequest, DeviceMatcher};
use crate::usb::errors::X52DeviceError;

pub mod definitions;
pub mod errors;
mod x52_usb_device;

pub use x52_usb_device::X52UsbDevice;

/// Transport handle to one attached display, as used by a device session.
///
/// `begin_update`, a sequence of `send_request` calls and `end_update` make up one update.
/// `release` consumes the handle and is called exactly once, when the device terminates.
#[async_trait]
pub trait ClockDevice: Send + Sync + 'static {
    async fn begin_update(&self) -> Result<(), X52DeviceError>;

    /// Issues one host-to-device vendor control transfer with a zero-length data stage.
    async fn send_request(&self, request: ClockRequest) -> Result<(), X52DeviceError>;

    async fn end_update(&self) -> Result<(), X52DeviceError>;

    fn release(self) -> Result<(), X52DeviceError>
    where
        Self: Sized;
}

/// A newly matched device reported by the bus, not yet turned into a handle.
pub trait DeviceCandidate: Send + 'static {
    /// Identifies the physical device for the termination notification.
    type Key: Copy + Eq + Hash + Debug + Send + Sync + 'static;
    type Device: ClockDevice;

    fn key(&self) -> Self::Key;

    /// Human readable description used in logs.
    fn description(&self) -> String;

    /// Obtains a transport handle; consumes the candidate whatever the outcome.
    fn negotiate(self) -> Result<Self::Device, X52DeviceError>;
}

impl DeviceCandidate for DeviceInfo {
    type Key = DeviceId;
    type Device = X52UsbDevice;

    fn key(&self) -> DeviceId {
        self.id()
    }

    fn description(&self) -> String {
        format!("\"{}\" ({:04X}:{:04X}) at bus {} address {}",
                self.product_string().unwrap_or("Unknown"),
                self.vendor_id(),
                self.product_id(),
                self.bus_number(),
                self.device_address())
    }

    fn negotiate(self) -> Result<X52UsbDevice, X52DeviceError> {
        let device = self.open().map_err(X52DeviceError::Open)?;
        Ok(X52UsbDevice::new(device))
    }
}

pub fn is_matching_device(device_info: &DeviceInfo, matcher: &DeviceMatcher) -> bool {
    matcher.matches(device_info.vendor_id(), device_info.product_id())
}

/// Lists currently attached devices matching the given identifiers.
pub fn list_matching_devices(matcher: DeviceMatcher) -> Result<Vec<DeviceInfo>, std::io::Error> {
    Ok(nusb::list_devices()?
        .filter(|device_info| is_matching_device(device_info, &matcher))
        .collect())
}
