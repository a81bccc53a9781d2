//! Supervisor
//!
//! Tracks the liveness of every registered runner and forwards lifecycle
//! commands to it. Every outbound call is bounded by a deadline; when the
//! deadline passes the call is dropped and the runner's status degrades to
//! `unknown`.

use corral_core::domain::runner::{RunnerRecord, RunnerStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::repository::{ControlError, RunnerControl, RunnerStore};
use crate::service::runner_service::{self, RunnerError};

/// Health and lifecycle supervisor for the runner fleet
#[derive(Clone)]
pub struct Supervisor {
    store: Arc<dyn RunnerStore>,
    control: Arc<dyn RunnerControl>,
    probe_timeout: Duration,
    restart_timeout: Duration,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn RunnerStore>,
        control: Arc<dyn RunnerControl>,
        probe_timeout: Duration,
        restart_timeout: Duration,
    ) -> Self {
        Self {
            store,
            control,
            probe_timeout,
            restart_timeout,
        }
    }

    /// Probes a runner now and records the result
    ///
    /// Only fails when the runner is not registered; any network problem
    /// yields `Unknown`.
    pub async fn probe_status(&self, name: &str) -> runner_service::Result<RunnerStatus> {
        let runner = runner_service::get_runner(self.store.as_ref(), name).await?;
        let status = self.probe(&runner).await;
        runner_service::update_status(self.store.as_ref(), &runner.name, status).await?;
        Ok(status)
    }

    /// Restarts a runner
    ///
    /// On success the runner is marked running; on failure or timeout it is
    /// marked unknown and the error is returned.
    pub async fn restart(&self, name: &str) -> runner_service::Result<()> {
        let runner = runner_service::get_runner(self.store.as_ref(), name).await?;

        info!("Restarting runner {} at {}", runner.name, runner.url);

        let outcome = time::timeout(self.restart_timeout, self.control.restart(&runner)).await;

        let (status, result) = match outcome {
            Ok(Ok(())) => {
                info!("Runner {} restarted successfully", runner.name);
                (RunnerStatus::Running, Ok(()))
            }
            Ok(Err(e)) => {
                warn!("Failed to restart runner {}: {}", runner.name, describe(&e));
                (
                    RunnerStatus::Unknown,
                    Err(RunnerError::RestartFailed {
                        name: runner.name.clone(),
                        reason: summary(&e),
                    }),
                )
            }
            Err(_) => {
                warn!(
                    "Restart of runner {} timed out after {:?}",
                    runner.name, self.restart_timeout
                );
                (
                    RunnerStatus::Unknown,
                    Err(RunnerError::Timeout {
                        name: runner.name.clone(),
                        timeout: self.restart_timeout,
                    }),
                )
            }
        };

        runner_service::update_status(self.store.as_ref(), &runner.name, status).await?;
        result
    }

    /// Asks a runner to stop, logging instead of failing
    ///
    /// Used when a runner is deleted: the registry entry is already gone, so
    /// an unreachable runner must not turn the delete into an error.
    pub async fn stop(&self, runner: &RunnerRecord) {
        match time::timeout(self.restart_timeout, self.control.stop(runner)).await {
            Ok(Ok(())) => info!("Stopped runner {}", runner.name),
            Ok(Err(e)) => warn!(
                "Warning: failed to stop runner {}: {}",
                runner.name,
                describe(&e)
            ),
            Err(_) => warn!(
                "Warning: stopping runner {} timed out after {:?}",
                runner.name, self.restart_timeout
            ),
        }
    }

    /// Probes every registered runner concurrently and records the results
    ///
    /// Returns the number of runners whose status changed. A result that
    /// cannot be stored is logged and skipped.
    pub async fn refresh_all(&self) -> runner_service::Result<usize> {
        let runners = runner_service::list_runners(self.store.as_ref()).await?;

        let mut probes = JoinSet::new();
        for runner in runners {
            let supervisor = self.clone();
            probes.spawn(async move {
                let status = supervisor.probe(&runner).await;
                (runner, status)
            });
        }

        let mut changed = 0;
        while let Some(joined) = probes.join_next().await {
            let (runner, status) = match joined {
                Ok(probed) => probed,
                Err(e) => {
                    warn!("Probe task panicked: {}", e);
                    continue;
                }
            };

            if let Err(e) =
                runner_service::update_status(self.store.as_ref(), &runner.name, status).await
            {
                error!("Failed to record status of runner {}: {}", runner.name, e);
                continue;
            }

            if runner.status != status {
                info!(
                    "Runner {} status changed: {} -> {}",
                    runner.name, runner.status, status
                );
                changed += 1;
            }
        }

        Ok(changed)
    }

    /// Starts the background refresh loop
    pub fn spawn_refresh_loop(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let supervisor = self.clone();

        tokio::spawn(async move {
            info!("Starting status refresh loop (interval: {:?})", interval);

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                debug!("Refreshing runner statuses");

                match supervisor.refresh_all().await {
                    Ok(changed) if changed > 0 => {
                        debug!("{} runner status(es) changed this cycle", changed)
                    }
                    Ok(_) => {}
                    Err(e) => error!("Error during status refresh: {}", e),
                }
            }
        })
    }

    /// Probes a newly registered runner in the background
    pub fn spawn_initial_probe(&self, name: String) {
        let supervisor = self.clone();

        tokio::spawn(async move {
            match supervisor.probe_status(&name).await {
                Ok(status) => debug!("Initial probe of runner {}: {}", name, status),
                Err(e) => debug!("Initial probe of runner {} skipped: {}", name, e),
            }
        });
    }

    async fn probe(&self, runner: &RunnerRecord) -> RunnerStatus {
        match time::timeout(self.probe_timeout, self.control.status(runner)).await {
            Ok(Ok(answer)) => answer.status,
            Ok(Err(e)) => {
                debug!("Probe of runner {} failed: {}", runner.name, describe(&e));
                RunnerStatus::Unknown
            }
            Err(_) => {
                debug!(
                    "Probe of runner {} timed out after {:?}",
                    runner.name, self.probe_timeout
                );
                RunnerStatus::Unknown
            }
        }
    }
}

/// Short reason safe to hand back to API callers
fn summary(err: &ControlError) -> String {
    match err {
        ControlError::Unreachable(_) => "runner unreachable".to_string(),
        ControlError::Rejected { status, .. } => format!("runner answered with status {}", status),
        ControlError::InvalidResponse(_) => "invalid response from runner".to_string(),
    }
}

/// Full error text for logs, including any body the runner sent back
fn describe(err: &ControlError) -> String {
    match err {
        ControlError::Rejected { status, body } if !body.is_empty() => {
            format!("runner rejected the request with status {}: {}", status, body)
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{DeleteOutcome, InMemoryRunnerStore, StoreError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use corral_core::dto::agent::AgentStatus;
    use corral_core::dto::runner::RegisterRunner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Behaviour {
        Running,
        Stopped,
        Failing,
        Hanging,
    }

    struct FakeControl {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeControl {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }

        async fn act(&self) -> Result<(), ControlError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Running | Behaviour::Stopped => Ok(()),
                Behaviour::Failing => Err(ControlError::Unreachable("connection refused".into())),
                Behaviour::Hanging => {
                    time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            }
        }
    }

    #[async_trait]
    impl RunnerControl for FakeControl {
        async fn status(&self, _runner: &RunnerRecord) -> Result<AgentStatus, ControlError> {
            self.act().await?;
            let status = match self.behaviour {
                Behaviour::Stopped => RunnerStatus::Stopped,
                _ => RunnerStatus::Running,
            };
            Ok(AgentStatus {
                status,
                pid: None,
                started_at: None,
            })
        }

        async fn restart(&self, _runner: &RunnerRecord) -> Result<(), ControlError> {
            self.act().await
        }

        async fn stop(&self, _runner: &RunnerRecord) -> Result<(), ControlError> {
            self.act().await
        }
    }

    /// In-memory store that refuses to record the status of one runner
    struct FlakyStore {
        inner: InMemoryRunnerStore,
        broken: &'static str,
    }

    #[async_trait]
    impl RunnerStore for FlakyStore {
        async fn insert(&self, record: RunnerRecord) -> Result<bool, StoreError> {
            self.inner.insert(record).await
        }

        async fn find_by_name(&self, name: &str) -> Result<Option<RunnerRecord>, StoreError> {
            self.inner.find_by_name(name).await
        }

        async fn list_all(&self) -> Result<Vec<RunnerRecord>, StoreError> {
            self.inner.list_all().await
        }

        async fn delete_with_token(
            &self,
            name: &str,
            token: &str,
        ) -> Result<DeleteOutcome, StoreError> {
            self.inner.delete_with_token(name, token).await
        }

        async fn update_status(
            &self,
            name: &str,
            status: RunnerStatus,
            checked_at: DateTime<Utc>,
        ) -> Result<bool, StoreError> {
            if name == self.broken {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.inner.update_status(name, status, checked_at).await
        }
    }

    async fn setup(behaviour: Behaviour, names: &[&str]) -> (Supervisor, Arc<FakeControl>) {
        let store: Arc<dyn RunnerStore> = Arc::new(InMemoryRunnerStore::new());
        for name in names {
            runner_service::register_runner(
                store.as_ref(),
                RegisterRunner {
                    name: name.to_string(),
                    url: format!("http://{}.local:8099", name),
                    token: "tok".to_string(),
                },
            )
            .await
            .unwrap();
        }

        let control = FakeControl::new(behaviour);
        let supervisor = Supervisor::new(
            store,
            control.clone(),
            Duration::from_millis(100),
            Duration::from_millis(200),
        );
        (supervisor, control)
    }

    async fn stored_status(supervisor: &Supervisor, name: &str) -> RunnerStatus {
        runner_service::get_runner(supervisor.store.as_ref(), name)
            .await
            .unwrap()
            .status
    }

    #[tokio::test]
    async fn test_probe_records_reported_status() {
        let (supervisor, _) = setup(Behaviour::Stopped, &["a"]).await;

        let status = supervisor.probe_status("a").await.unwrap();
        assert_eq!(status, RunnerStatus::Stopped);
        assert_eq!(stored_status(&supervisor, "a").await, RunnerStatus::Stopped);
    }

    #[tokio::test]
    async fn test_probe_unknown_runner() {
        let (supervisor, _) = setup(Behaviour::Running, &[]).await;
        let result = supervisor.probe_status("ghost").await;
        assert!(matches!(result, Err(RunnerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_probe_of_hanging_runner_is_bounded() {
        let (supervisor, _) = setup(Behaviour::Hanging, &["a"]).await;

        let started = std::time::Instant::now();
        let status = supervisor.probe_status("a").await.unwrap();

        assert_eq!(status, RunnerStatus::Unknown);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_probe_of_unreachable_url_is_unknown() {
        let store: Arc<dyn RunnerStore> = Arc::new(InMemoryRunnerStore::new());
        store
            .insert(RunnerRecord::new("a", "http://127.0.0.1:1", "tok"))
            .await
            .unwrap();
        let control = Arc::new(
            crate::repository::HttpRunnerControl::new(Duration::from_millis(200)).unwrap(),
        );
        let supervisor = Supervisor::new(
            store,
            control,
            Duration::from_millis(500),
            Duration::from_millis(500),
        );

        let started = std::time::Instant::now();
        let status = supervisor.probe_status("a").await.unwrap();
        assert_eq!(status, RunnerStatus::Unknown);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_restart_marks_runner_running() {
        let (supervisor, control) = setup(Behaviour::Running, &["a"]).await;

        supervisor.restart("a").await.unwrap();

        assert_eq!(control.calls.load(Ordering::SeqCst), 1);
        assert_eq!(stored_status(&supervisor, "a").await, RunnerStatus::Running);
    }

    #[tokio::test]
    async fn test_failed_restart_marks_runner_unknown() {
        let (supervisor, _) = setup(Behaviour::Failing, &["a"]).await;
        runner_service::update_status(supervisor.store.as_ref(), "a", RunnerStatus::Running)
            .await
            .unwrap();

        let result = supervisor.restart("a").await;

        assert!(matches!(result, Err(RunnerError::RestartFailed { .. })));
        assert_eq!(stored_status(&supervisor, "a").await, RunnerStatus::Unknown);
    }

    #[tokio::test]
    async fn test_restart_times_out() {
        let (supervisor, _) = setup(Behaviour::Hanging, &["a"]).await;

        let started = std::time::Instant::now();
        let result = supervisor.restart("a").await;

        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(stored_status(&supervisor, "a").await, RunnerStatus::Unknown);
    }

    #[tokio::test]
    async fn test_restart_unknown_runner() {
        let (supervisor, control) = setup(Behaviour::Running, &[]).await;
        let result = supervisor.restart("ghost").await;
        assert!(matches!(result, Err(RunnerError::NotFound(_))));
        assert_eq!(control.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_never_fails() {
        let (supervisor, control) = setup(Behaviour::Failing, &["a"]).await;
        let runner = RunnerRecord::new("a", "http://a.local:8099", "tok");
        supervisor.stop(&runner).await;
        assert_eq!(control.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_all_probes_in_parallel() {
        let names = ["a", "b", "c", "d", "e"];
        let (supervisor, control) = setup(Behaviour::Hanging, &names).await;

        // Five hanging runners with a 100ms probe timeout each: serial probing
        // would take at least 500ms.
        let started = std::time::Instant::now();
        let changed = supervisor.refresh_all().await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(450));
        assert_eq!(changed, 0);
        assert_eq!(control.calls.load(Ordering::SeqCst), names.len());
        for name in names {
            assert_eq!(stored_status(&supervisor, name).await, RunnerStatus::Unknown);
        }
    }

    #[tokio::test]
    async fn test_refresh_all_counts_changes() {
        let (supervisor, _) = setup(Behaviour::Running, &["a", "b"]).await;

        assert_eq!(supervisor.refresh_all().await.unwrap(), 2);
        assert_eq!(supervisor.refresh_all().await.unwrap(), 0);
        assert_eq!(stored_status(&supervisor, "b").await, RunnerStatus::Running);
    }

    #[tokio::test]
    async fn test_refresh_all_continues_past_store_failure() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryRunnerStore::new(),
            broken: "b",
        });
        for name in ["a", "b", "c"] {
            store
                .insert(RunnerRecord::new(name, &format!("http://{}.local:8099", name), "tok"))
                .await
                .unwrap();
        }

        let control = FakeControl::new(Behaviour::Running);
        let supervisor = Supervisor::new(
            store,
            control.clone(),
            Duration::from_millis(100),
            Duration::from_millis(200),
        );

        let changed = supervisor.refresh_all().await.unwrap();

        assert_eq!(changed, 2);
        assert_eq!(control.calls.load(Ordering::SeqCst), 3);
        assert_eq!(stored_status(&supervisor, "a").await, RunnerStatus::Running);
        assert_eq!(stored_status(&supervisor, "b").await, RunnerStatus::Unknown);
        assert_eq!(stored_status(&supervisor, "c").await, RunnerStatus::Running);
    }
}
