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

//! Mock implementations of the device seams shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use nusb::transfer::TransferError;
use crate::usb::definitions::{ClockRequest, X52RegisterIndex};
use crate::usb::errors::X52DeviceError;
use crate::usb::{ClockDevice, DeviceCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeviceCall {
    BeginUpdate,
    Send(ClockRequest),
    EndUpdate,
    Release,
}

#[derive(Default)]
pub(crate) struct DeviceLog {
    calls: Mutex<Vec<DeviceCall>>,
}

impl DeviceLog {
    pub(crate) fn new() -> Arc<Self> { Arc::new(Self::default()) }

    fn push(&self, call: DeviceCall) { self.calls.lock().unwrap().push(call) }

    pub(crate) fn calls(&self) -> Vec<DeviceCall> { self.calls.lock().unwrap().clone() }

    pub(crate) fn count(&self, call: &DeviceCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub(crate) fn sent(&self) -> Vec<ClockRequest> {
        self.calls.lock().unwrap().iter().filter_map(|c| match c {
            DeviceCall::Send(request) => Some(*request),
            _ => None,
        }).collect()
    }

    pub(crate) fn sent_indices(&self) -> Vec<X52RegisterIndex> {
        self.sent().into_iter().map(|request| request.index).collect()
    }
}

pub(crate) struct MockDevice {
    log: Arc<DeviceLog>,
    failing_index: Option<X52RegisterIndex>,
    busy: bool,
    send_delay: Duration,
}

impl MockDevice {
    pub(crate) fn new(log: Arc<DeviceLog>) -> Self {
        Self { log, failing_index: None, busy: false, send_delay: Duration::ZERO }
    }

    pub(crate) fn failing_on(mut self, index: X52RegisterIndex) -> Self {
        self.failing_index = Some(index);
        self
    }

    /// Every `begin_update` is rejected as if another update held the handle.
    pub(crate) fn busy(mut self) -> Self {
        self.busy = true;
        self
    }

    pub(crate) fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }
}

#[async_trait]
impl ClockDevice for MockDevice {
    async fn begin_update(&self) -> Result<(), X52DeviceError> {
        if self.busy {
            return Err(X52DeviceError::UpdateInProgress);
        }
        self.log.push(DeviceCall::BeginUpdate);
        Ok(())
    }

    async fn send_request(&self, request: ClockRequest) -> Result<(), X52DeviceError> {
        if !self.send_delay.is_zero() {
            tokio::time::sleep(self.send_delay).await;
        }
        self.log.push(DeviceCall::Send(request));
        if self.failing_index == Some(request.index) {
            return Err(X52DeviceError::ControlTransfer { index: request.index.into(), status: TransferError::Stall });
        }
        Ok(())
    }

    async fn end_update(&self) -> Result<(), X52DeviceError> {
        self.log.push(DeviceCall::EndUpdate);
        Ok(())
    }

    fn release(self) -> Result<(), X52DeviceError> {
        self.log.push(DeviceCall::Release);
        Ok(())
    }
}

pub(crate) struct MockCandidate {
    pub(crate) key: u32,
    pub(crate) log: Arc<DeviceLog>,
    pub(crate) negotiation_fails: bool,
    pub(crate) failing_index: Option<X52RegisterIndex>,
}

impl MockCandidate {
    pub(crate) fn new(key: u32, log: Arc<DeviceLog>) -> Self {
        Self { key, log, negotiation_fails: false, failing_index: None }
    }

    pub(crate) fn unreachable(key: u32, log: Arc<DeviceLog>) -> Self {
        Self { negotiation_fails: true, ..Self::new(key, log) }
    }
}

impl DeviceCandidate for MockCandidate {
    type Key = u32;
    type Device = MockDevice;

    fn key(&self) -> u32 { self.key }

    fn description(&self) -> String { format!("mock device #{}", self.key) }

    fn negotiate(self) -> Result<MockDevice, X52DeviceError> {
        if self.negotiation_fails {
            return Err(X52DeviceError::Open(std::io::Error::from(std::io::ErrorKind::PermissionDenied)));
        }
        let device = MockDevice::new(self.log);
        Ok(match self.failing_index {
            Some(index) => device.failing_on(index),
            None => device,
        })
    }
}
