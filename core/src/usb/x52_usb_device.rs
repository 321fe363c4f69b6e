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

use std::sync::atomic::{AtomicBool, Ordering};
use async_trait::async_trait;
use log::{debug, trace};
use nusb::transfer::{ControlOut, ControlType, Recipient};
use crate::usb::definitions::{ClockRequest, X52_REQUEST_CODE};
use crate::usb::errors::X52DeviceError;
use crate::usb::ClockDevice;

/// X52 Pro handle backed by an `nusb` device.
///
/// The platform handle obtained during negotiation stays open for the whole session.
/// `begin_update`/`end_update` only bracket one update sequence, keeping two sequences from
/// interleaving on the same handle.
pub struct X52UsbDevice {
    device: nusb::Device,
    updating: AtomicBool,
}

impl X52UsbDevice {
    pub(super) fn new(device: nusb::Device) -> Self {
        Self {
            device,
            updating: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ClockDevice for X52UsbDevice {
    async fn begin_update(&self) -> Result<(), X52DeviceError> {
        self.updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| X52DeviceError::UpdateInProgress)
    }

    async fn send_request(&self, request: ClockRequest) -> Result<(), X52DeviceError> {
        if !self.updating.load(Ordering::Acquire) {
            return Err(X52DeviceError::NoUpdateInProgress);
        }
        let index = u16::from(request.index);
        let control_out = ControlOut {
            control_type: ControlType::Vendor,
            recipient: Recipient::Device,
            request: X52_REQUEST_CODE,
            value: request.value,
            index,
            data: &[],
        };
        trace!("Sending vendor request {:#04x}: value {:#06x}, index {:#06x}", X52_REQUEST_CODE, request.value, index);
        self.device.control_out(control_out)
            .await
            .into_result()
            .map_err(|status| X52DeviceError::ControlTransfer { index, status })?;
        Ok(())
    }

    async fn end_update(&self) -> Result<(), X52DeviceError> {
        if self.updating.swap(false, Ordering::AcqRel) {
            Ok(())
        } else {
            Err(X52DeviceError::NoUpdateInProgress)
        }
    }

    fn release(self) -> Result<(), X52DeviceError> {
        if self.updating.load(Ordering::Acquire) {
            debug!("Releasing X52 device handle while an update was still in progress");
        }
        drop(self.device);
        Ok(())
    }
}
