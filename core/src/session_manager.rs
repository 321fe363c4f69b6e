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

use std::collections::HashMap;
use std::mem::swap;
use std::ops::DerefMut;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use log::{debug, info, warn};
use crate::local_clock::LocalClock;
use crate::preferences::PreferenceStore;
use crate::session::{DeviceSession, SessionContext};
use crate::usb::DeviceCandidate;

type SessionMap<C> = HashMap<<C as DeviceCandidate>::Key, DeviceSession<<C as DeviceCandidate>::Key, <C as DeviceCandidate>::Device>>;

/// Keeps exactly one session per attached matching device.
///
/// Arrival and termination are dispatched by the event loop; updates run on the timers
/// owned by the sessions.
pub struct DeviceSessionManager<C: DeviceCandidate> {
    sessions: Mutex<SessionMap<C>>,
    context: SessionContext,
}

impl<C: DeviceCandidate> DeviceSessionManager<C> {
    pub fn new(preferences: Arc<dyn PreferenceStore>,
               clock: Arc<dyn LocalClock>,
               update_period: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            context: SessionContext { preferences, clock, update_period },
        }
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, SessionMap<C>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handles newly matched devices, one after another.
    ///
    /// A candidate that cannot be negotiated is logged and skipped; it stays unmanaged until
    /// a later arrival. Returns the number of sessions started. Must be called from within a
    /// Tokio runtime.
    pub fn on_device_arrival<I>(&self, candidates: I) -> usize
    where
        I: IntoIterator<Item = C>,
    {
        let mut started = 0;
        for candidate in candidates {
            let key = candidate.key();
            let description = candidate.description();

            if self.lock_sessions().contains_key(&key) {
                debug!("Device {} is already managed, ignoring arrival", description);
                continue;
            }

            let device = match candidate.negotiate() {
                Ok(device) => device,
                Err(e) => {
                    warn!("Failed to initialize device {}: {}", description, e);
                    continue;
                }
            };

            let mut session = DeviceSession::attach(description.clone(), device);
            session.activate(key, &self.context);
            self.lock_sessions().insert(key, session);
            info!("X52 Pro device found: {}", description);
            started += 1;
        }
        started
    }

    /// Handles the termination notification of a device.
    ///
    /// Returns false when the device had no session.
    pub async fn on_device_terminated(&self, key: C::Key) -> bool {
        let session = self.lock_sessions().remove(&key);
        match session {
            Some(session) => {
                let description = session.description().to_string();
                session.terminate().await;
                info!("X52 Pro device removed: {}", description);
                true
            }
            None => false,
        }
    }

    /// Terminates every session.
    pub async fn terminate_all(&self) {
        let mut local_sessions = HashMap::new();
        swap(&mut local_sessions, self.lock_sessions().deref_mut());
        for (_, session) in local_sessions {
            session.terminate().await;
        }
    }

    pub fn is_managed(&self, key: &C::Key) -> bool {
        self.lock_sessions().contains_key(key)
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::local_clock::FixedLocalClock;
    use crate::preferences::MemoryPreferenceStore;
    use crate::test_support::{DeviceCall, DeviceLog, MockCandidate};
    use crate::usb::definitions::X52RegisterIndex;

    fn build_manager(period: Duration) -> DeviceSessionManager<MockCandidate> {
        build_manager_with_preferences(period, MemoryPreferenceStore::new())
    }

    fn build_manager_with_preferences(period: Duration, preferences: MemoryPreferenceStore) -> DeviceSessionManager<MockCandidate> {
        let timestamp = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap().and_hms_opt(23, 59, 0).unwrap();
        DeviceSessionManager::new(Arc::new(preferences), Arc::new(FixedLocalClock(timestamp)), period)
    }

    async fn short_wait() { tokio::time::sleep(Duration::from_millis(50)).await }

    #[tokio::test]
    async fn arrival_starts_session_with_immediate_update() {
        let manager = build_manager(Duration::from_secs(1));
        let log = DeviceLog::new();
        assert_eq!(manager.on_device_arrival([MockCandidate::new(1, log.clone())]), 1);
        assert!(manager.is_managed(&1));
        short_wait().await;
        assert_eq!(log.sent_indices(), vec![
            X52RegisterIndex::PrimaryClock,
            X52RegisterIndex::DateDayMonth,
            X52RegisterIndex::DateYear,
        ]);
        manager.terminate_all().await;
    }

    #[tokio::test]
    async fn arrival_then_termination_releases_handle_once_and_stops_updates() {
        let manager = build_manager(Duration::from_secs(1));
        let log = DeviceLog::new();
        manager.on_device_arrival([MockCandidate::new(1, log.clone())]);
        short_wait().await;
        assert_eq!(log.sent().len(), 3);

        assert!(manager.on_device_terminated(1).await);
        assert!(!manager.is_managed(&1));
        assert_eq!(log.count(&DeviceCall::Release), 1);

        // a second notification for the same device is a no-op
        assert!(!manager.on_device_terminated(1).await);
        assert_eq!(log.count(&DeviceCall::Release), 1);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(log.sent().len(), 3);
    }

    #[tokio::test]
    async fn negotiation_failure_skips_only_that_candidate() {
        let manager = build_manager(Duration::from_secs(1));
        let failing_log = DeviceLog::new();
        let log = DeviceLog::new();
        let started = manager.on_device_arrival([
            MockCandidate::unreachable(1, failing_log.clone()),
            MockCandidate::new(2, log.clone()),
        ]);
        assert_eq!(started, 1);
        assert!(!manager.is_managed(&1));
        assert!(manager.is_managed(&2));
        short_wait().await;
        assert!(failing_log.calls().is_empty());
        assert_eq!(log.sent().len(), 3);

        // a later arrival of the same device can still be managed
        let retry_log = DeviceLog::new();
        assert_eq!(manager.on_device_arrival([MockCandidate::new(1, retry_log.clone())]), 1);
        assert_eq!(manager.session_count(), 2);
        manager.terminate_all().await;
    }

    #[tokio::test]
    async fn duplicate_arrival_keeps_single_session() {
        let manager = build_manager(Duration::from_secs(1));
        let log = DeviceLog::new();
        let duplicate_log = DeviceLog::new();
        manager.on_device_arrival([MockCandidate::new(5, log.clone())]);
        assert_eq!(manager.on_device_arrival([MockCandidate::new(5, duplicate_log.clone())]), 0);
        assert_eq!(manager.session_count(), 1);
        short_wait().await;
        assert!(duplicate_log.calls().is_empty());
        manager.terminate_all().await;
    }

    #[tokio::test]
    async fn devices_run_independent_sessions() {
        let manager = build_manager(Duration::from_millis(20));
        let log_a = DeviceLog::new();
        let log_b = DeviceLog::new();
        manager.on_device_arrival([MockCandidate::new(1, log_a.clone()), MockCandidate::new(2, log_b.clone())]);
        short_wait().await;

        manager.on_device_terminated(1).await;
        let sent_a = log_a.sent().len();
        let sent_b = log_b.sent().len();
        short_wait().await;

        assert_eq!(log_a.sent().len(), sent_a);
        assert!(log_b.sent().len() > sent_b);
        manager.terminate_all().await;
        assert_eq!(log_b.count(&DeviceCall::Release), 1);
    }

    #[tokio::test]
    async fn failing_transfer_does_not_cancel_timer() {
        let manager = build_manager(Duration::from_millis(20));
        let log = DeviceLog::new();
        let mut candidate = MockCandidate::new(1, log.clone());
        candidate.failing_index = Some(X52RegisterIndex::DateDayMonth);
        manager.on_device_arrival([candidate]);
        tokio::time::sleep(Duration::from_millis(70)).await;
        let indices = log.sent_indices();
        assert!(indices.len() >= 6, "{:?}", indices);
        assert_eq!(&indices[..3], &[
            X52RegisterIndex::PrimaryClock,
            X52RegisterIndex::DateDayMonth,
            X52RegisterIndex::DateYear,
        ]);
        assert!(manager.is_managed(&1));
        manager.terminate_all().await;
    }

    #[tokio::test]
    async fn missing_clock_type_encodes_24_hour_mode() {
        let preferences = MemoryPreferenceStore::with_values([("DateFormat", "mmddyy")]);
        let manager = build_manager_with_preferences(Duration::from_secs(1), preferences);
        let log = DeviceLog::new();
        manager.on_device_arrival([MockCandidate::new(1, log.clone())]);
        short_wait().await;
        let sent = log.sent();
        assert_eq!(sent[0].value & 0x8000, 0x8000);
        assert_eq!(sent[1].value, 0x050C);
        manager.terminate_all().await;
    }

    #[tokio::test]
    async fn terminate_all_releases_every_session() {
        let manager = build_manager(Duration::from_secs(1));
        let logs: Vec<_> = (0..3).map(|_| DeviceLog::new()).collect();
        manager.on_device_arrival(logs.iter().enumerate().map(|(i, log)| MockCandidate::new(i as u32, log.clone())));
        assert_eq!(manager.session_count(), 3);
        manager.terminate_all().await;
        assert_eq!(manager.session_count(), 0);
        for log in logs {
            assert_eq!(log.count(&DeviceCall::Release), 1);
        }
    }
}
