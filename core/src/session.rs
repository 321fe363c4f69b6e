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
use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{debug, info, trace, warn};
use tokio::select;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use crate::clock_encoder::encode_clock_update;
use crate::local_clock::LocalClock;
use crate::preferences::{DisplayPreferences, PreferenceStore};
use crate::service::{spawn_service, ServiceHandle};
use crate::usb::ClockDevice;

/// Period used when a zero period is configured.
const MIN_UPDATE_PERIOD: Duration = Duration::from_millis(1);

/// Lifecycle of a device session. There is no way back from `Terminating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handle obtained, no timer yet.
    Attached,
    /// Update timer running.
    Active,
    /// Timer cancelled, resources being released.
    Terminating,
    /// Everything released.
    Freed,
}

/// Interest in the termination of one physical device.
#[derive(Debug)]
pub struct TerminationSubscription<K> {
    key: K,
    subscribed_at: Instant,
}

impl<K: Debug> TerminationSubscription<K> {
    pub fn new(key: K) -> Self {
        Self { key, subscribed_at: Instant::now() }
    }

    pub fn release(self) {
        debug!("Termination subscription for {:?} released after {:?}", self.key, self.subscribed_at.elapsed());
    }
}

/// Dependencies shared by the update timers of all sessions.
#[derive(Clone)]
pub struct SessionContext {
    pub preferences: Arc<dyn PreferenceStore>,
    pub clock: Arc<dyn LocalClock>,
    pub update_period: Duration,
}

/// Result of one update of a device.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateReport {
    pub sent: usize,
    pub failed: usize,
}

type SharedDevice<D> = Arc<Mutex<Option<D>>>;

/// Managed lifetime of one attached display, from arrival to termination.
///
/// The session owns the transport handle, the recurring update timer and the termination
/// subscription. `terminate` stops the timer before the handle is released, so no update can
/// observe a released handle.
pub struct DeviceSession<K, D: ClockDevice> {
    description: String,
    state: SessionState,
    device: SharedDevice<D>,
    update_timer: Option<ServiceHandle>,
    termination_subscription: Option<TerminationSubscription<K>>,
}

impl<K: Debug + Send + 'static, D: ClockDevice> DeviceSession<K, D> {
    pub fn attach(description: String, device: D) -> Self {
        Self {
            description,
            state: SessionState::Attached,
            device: Arc::new(Mutex::new(Some(device))),
            update_timer: None,
            termination_subscription: None,
        }
    }

    /// Starts the update timer, first update immediately, and subscribes to termination.
    pub fn activate(&mut self, key: K, context: &SessionContext) {
        if self.state != SessionState::Attached {
            warn!("Session of {} cannot be activated in state {:?}", self.description, self.state);
            return;
        }
        self.update_timer = Some(start_update_timer(self.device.clone(), context.clone(), self.description.clone()));
        self.termination_subscription = Some(TerminationSubscription::new(key));
        self.state = SessionState::Active;
        info!("Started clock updates of {}", self.description);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Tears the session down: timer, then handle, then termination subscription.
    ///
    /// An update in progress is allowed to finish; no update starts afterwards. Release
    /// failures are logged and do not stop the remaining steps.
    pub async fn terminate(mut self) -> SessionState {
        self.state = SessionState::Terminating;

        if let Some(timer) = self.update_timer.take() {
            if let Err(e) = timer.shutdown().await {
                warn!("Update timer of {} did not stop cleanly: {}", self.description, e);
            }
        }

        let device = self.device.lock().await.take();
        if let Some(device) = device {
            if let Err(e) = device.release() {
                warn!("Failed to release handle of {}: {}", self.description, e);
            }
        }

        if let Some(subscription) = self.termination_subscription.take() {
            subscription.release();
        }

        self.state = SessionState::Freed;
        info!("Stopped clock updates of {}", self.description);
        self.state
    }
}

fn start_update_timer<D: ClockDevice>(device: SharedDevice<D>,
                                      context: SessionContext,
                                      description: String) -> ServiceHandle {
    spawn_service(move |mut stop| async move {
        let mut interval = tokio::time::interval(context.update_period.max(MIN_UPDATE_PERIOD));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            select! {
                biased;
                _ = stop.signaled() => break,
                _ = interval.tick() => {
                    if let Some(report) = update_device(&device, &context, &description).await {
                        trace!("Updated {}: {} sent, {} failed", description, report.sent, report.failed);
                    }
                }
            }
        }
        debug!("Update timer of {} stopped", description);
    })
}

/// Sends the current time and date to the device once.
///
/// Returns `None` when the handle has already been released. A failing transfer is logged
/// and the remaining ones are still attempted.
pub async fn update_device<D: ClockDevice>(device: &Mutex<Option<D>>,
                                           context: &SessionContext,
                                           description: &str) -> Option<UpdateReport> {
    let device = device.lock().await;
    let Some(device) = device.as_ref() else {
        trace!("Handle of {} already released, skipping update", description);
        return None;
    };

    let now = context.clock.now();
    let preferences = load_display_preferences(&context.preferences, description).await;
    let requests = encode_clock_update(&now, &preferences);

    let mut report = UpdateReport::default();
    if let Err(e) = device.begin_update().await {
        if e.is_transient() {
            debug!("Failed to begin update of {}: {}", description, e);
        } else {
            warn!("Failed to begin update of {}: {}", description, e);
        }
        report.failed = requests.len();
        return Some(report);
    }

    for request in requests {
        match device.send_request(request).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                report.failed += 1;
                warn!("Failed to update register {:?} of {}: {}", request.index, description, e);
            }
        }
    }

    if let Err(e) = device.end_update().await {
        warn!("Failed to end update of {}: {}", description, e);
    }
    Some(report)
}

/// File-backed stores hit the disk on every read, so the lookup runs on the blocking pool.
async fn load_display_preferences(store: &Arc<dyn PreferenceStore>, description: &str) -> DisplayPreferences {
    let store = store.clone();
    match tokio::task::spawn_blocking(move || DisplayPreferences::load(store.as_ref())).await {
        Ok(preferences) => preferences,
        Err(e) => {
            warn!("Failed to read preferences for {}, using defaults: {}", description, e);
            DisplayPreferences::default()
        }
    }
}
