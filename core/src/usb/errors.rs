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

use std::io;
use nusb::transfer::TransferError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum X52DeviceError {
    #[error("Failed to open device: {0}")]
    Open(#[source] io::Error),

    #[error("No update in progress on device")]
    NoUpdateInProgress,

    #[error("Another update is already in progress on device")]
    UpdateInProgress,

    #[error("Control transfer to register {index:#04x} failed with status {status:?}")]
    ControlTransfer {
        index: u16,
        status: TransferError,
    },
}

impl X52DeviceError {
    /// Returns true for failures that are expected to clear up by the next update.
    pub fn is_transient(&self) -> bool {
        matches!(self, X52DeviceError::ControlTransfer { .. } | X52DeviceError::NoUpdateInProgress)
    }
}

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed preferences file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Preferences file does not contain a JSON object")]
    NotAnObject,
}
