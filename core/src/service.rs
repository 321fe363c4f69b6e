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

use std::future::Future;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Passed to a background task so it can observe a stop request between two units of work.
pub struct StopHandle {
    shutdown_rx: oneshot::Receiver<()>,
}

impl StopHandle {
    fn new(shutdown_rx: oneshot::Receiver<()>) -> Self { Self { shutdown_rx } }

    /// Resolves once a stop was requested or the owning `ServiceHandle` was dropped.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to the task's own work:
    /// ```rust
    /// use std::time::Duration;
    /// use x52_clock_core::service::spawn_service;
    ///
    /// async fn run_ticker() {
    ///     let handle = spawn_service(move |mut stop| async move {
    ///         let mut interval = tokio::time::interval(Duration::from_secs(1));
    ///         loop {
    ///             tokio::select! {
    ///                 biased;
    ///                 _ = stop.signaled() => break,
    ///                 _ = interval.tick() => println!("tick"),
    ///             }
    ///         }
    ///     });
    ///     handle.shutdown().await.unwrap();
    /// }
    /// ```
    pub async fn signaled(&mut self) {
        (&mut self.shutdown_rx).await.unwrap_or_default();
    }
}

/// Owns a background task started by [`spawn_service`]; dropping it also signals the stop.
pub struct ServiceHandle {
    join: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServiceHandle {
    fn new(join: JoinHandle<()>, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self { join, shutdown_tx: Some(shutdown_tx) }
    }

    /// Request cooperative shutdown and await task completion.
    ///
    /// Work already in progress is finished, nothing new is started after the request.
    pub async fn shutdown(mut self) -> Result<(), tokio::task::JoinError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.join.await
    }
}

/// Spawn a background task with a standard stop mechanism.
pub fn spawn_service<Fut, Func>(f: Func) -> ServiceHandle
where
    Fut: Future<Output=()> + Send + 'static,
    Func: FnOnce(StopHandle) -> Fut + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let stop = StopHandle::new(shutdown_rx);
    let join = tokio::spawn(async move {
        f(stop).await;
    });
    ServiceHandle::new(join, shutdown_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn shutdown_stops_loop_and_joins() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task_counter = counter.clone();
        let handle = spawn_service(move |mut stop| async move {
            let mut interval = tokio::time::interval(Duration::from_millis(5));
            loop {
                tokio::select! {
                    biased;
                    _ = stop.signaled() => break,
                    _ = interval.tick() => { task_counter.fetch_add(1, Ordering::SeqCst); }
                }
            }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown().await.unwrap();
        let after_shutdown = counter.load(Ordering::SeqCst);
        assert!(after_shutdown > 0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_shutdown);
    }

    #[tokio::test]
    async fn dropping_handle_signals_stop() {
        let (done_tx, done_rx) = oneshot::channel();
        let handle = spawn_service(move |mut stop| async move {
            stop.signaled().await;
            let _ = done_tx.send(());
        });
        drop(handle);
        tokio::time::timeout(Duration::from_secs(1), done_rx).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_lets_current_unit_of_work_finish() {
        let (started_tx, started_rx) = oneshot::channel();
        let finished = Arc::new(AtomicUsize::new(0));
        let task_finished = finished.clone();
        let handle = spawn_service(move |mut stop| async move {
            let _ = started_tx.send(());
            tokio::time::sleep(Duration::from_millis(30)).await;
            task_finished.fetch_add(1, Ordering::SeqCst);
            stop.signaled().await;
        });
        started_rx.await.unwrap();
        handle.shutdown().await.unwrap();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
