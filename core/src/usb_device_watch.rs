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
use futures::StreamExt;
use log::{debug, info, warn};
use nusb::hotplug::HotplugEvent;
use nusb::DeviceInfo;
use crate::service::{spawn_service, ServiceHandle};
use crate::session_manager::DeviceSessionManager;
use crate::usb::definitions::DeviceMatcher;
use crate::usb::{is_matching_device, list_matching_devices, DeviceCandidate};

/// Session manager driven by the `nusb` device notifications.
pub type UsbSessionManager = DeviceSessionManager<DeviceInfo>;

/// Bus notification addressed to the session manager.
pub enum DeviceEvent<C: DeviceCandidate> {
    Arrived(C),
    Terminated(C::Key),
}

/// Drops arrivals of devices other than the ones being watched.
fn to_device_event(event: HotplugEvent, matcher: &DeviceMatcher) -> Option<DeviceEvent<DeviceInfo>> {
    match event {
        HotplugEvent::Connected(device_info) if is_matching_device(&device_info, matcher) => {
            Some(DeviceEvent::Arrived(device_info))
        }
        HotplugEvent::Connected(_) => None,
        HotplugEvent::Disconnected(device_id) => Some(DeviceEvent::Terminated(device_id)),
    }
}

pub async fn dispatch_device_event<C: DeviceCandidate>(device_manager: &DeviceSessionManager<C>,
                                                       event: DeviceEvent<C>) {
    match event {
        DeviceEvent::Arrived(candidate) => {
            device_manager.on_device_arrival([candidate]);
        }
        DeviceEvent::Terminated(key) => {
            if !device_manager.on_device_terminated(key).await {
                debug!("Ignoring termination of unmanaged device {:?}", key);
            }
        }
    }
}

/// Runs the USB device watch task.
///
/// Devices already attached are handled first, then arrivals and terminations are dispatched
/// to the manager as the bus reports them. Stopping the returned service terminates all
/// sessions.
pub fn run_usb_device_watch(device_manager: Arc<UsbSessionManager>,
                            matcher: DeviceMatcher) -> Result<ServiceHandle, anyhow::Error> {
    // subscribe before listing so no arrival in between is lost
    let mut devices_plug_events_stream = nusb::watch_devices()?;

    let handle = spawn_service(move |mut stop| async move {
        match list_matching_devices(matcher) {
            Ok(devices) => {
                let started = device_manager.on_device_arrival(devices);
                debug!("Initial enumeration started {} session(s)", started);
            }
            Err(e) => warn!("Failed to list USB devices: {}", e),
        }

        loop {
            tokio::select! {
                _ = stop.signaled() => {
                    debug!("Shutdown requested, stopping USB device watch task");
                    device_manager.terminate_all().await;
                    break;
                }
                maybe_event = devices_plug_events_stream.next() => {
                    let Some(event) = maybe_event else {
                        info!("Device events stream ended");
                        break;
                    };
                    if let Some(event) = to_device_event(event, &matcher) {
                        dispatch_device_event(&*device_manager, event).await;
                    }
                }
            }
        }
    });
    Ok(handle)
}
