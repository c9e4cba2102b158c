//! Job dispatcher — executes due jobs with bounded concurrency and
//! per-job fault isolation.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};

use guardpost_core::config::PlatformConfig;
use guardpost_core::error::Result;
use guardpost_core::traits::{CommentApi, Notifier};
use guardpost_core::types::{CredentialBundle, Proxy};
use guardpost_engine::{ModerationEngine, TaskOutcome};
use guardpost_platform::{decode_bundle, PlatformClient};
use guardpost_store::Store;

/// Builds the API client a job will talk through. A seam so the
/// dispatcher is testable without sockets.
pub trait ClientFactory: Send + Sync {
    fn build(&self, bundle: &CredentialBundle, proxy: &Proxy) -> Result<Box<dyn CommentApi>>;
}

/// Production factory: one proxied `PlatformClient` per job.
pub struct PlatformClientFactory {
    config: PlatformConfig,
}

impl PlatformClientFactory {
    pub fn new(config: PlatformConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for PlatformClientFactory {
    fn build(&self, bundle: &CredentialBundle, proxy: &Proxy) -> Result<Box<dyn CommentApi>> {
        Ok(Box::new(PlatformClient::new(bundle, proxy, &self.config)?))
    }
}

/// How a dispatched job ended.
#[derive(Debug)]
pub enum JobStatus {
    /// Task was gone or inactive by execution time — a silent no-op,
    /// not a failure.
    Skipped,
    /// An execution for this task id was already in flight.
    AlreadyRunning,
    /// The engine ran; its tagged outcome is attached.
    Finished(TaskOutcome),
}

/// Executes jobs against fresh store state.
pub struct Dispatcher {
    store: Arc<Store>,
    engine: ModerationEngine,
    clients: Arc<dyn ClientFactory>,
    /// Caps simultaneous executions so concurrent trigger firings
    /// cannot fan out unboundedly.
    slots: Semaphore,
    in_flight: Mutex<HashSet<i64>>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<Store>,
        notifier: Arc<dyn Notifier>,
        clients: Arc<dyn ClientFactory>,
        concurrency: usize,
    ) -> Self {
        Self {
            engine: ModerationEngine::new(store.clone(), notifier),
            store,
            clients,
            slots: Semaphore::new(concurrency.max(1)),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run one job for `task_id`. Never returns Err and never panics
    /// the caller — a single job's fault must not take down siblings
    /// or the dispatcher.
    pub async fn run_job(&self, task_id: i64) -> JobStatus {
        {
            let mut in_flight = self.in_flight.lock().await;
            if !in_flight.insert(task_id) {
                tracing::debug!("Task {task_id}: previous run still in flight, skipping tick");
                return JobStatus::AlreadyRunning;
            }
        }
        let status = self.execute(task_id).await;
        self.in_flight.lock().await.remove(&task_id);
        status
    }

    async fn execute(&self, task_id: i64) -> JobStatus {
        let _permit = match self.slots.acquire().await {
            Ok(permit) => permit,
            // The semaphore lives as long as the dispatcher and is
            // never closed.
            Err(_) => return JobStatus::Skipped,
        };

        // Always reload: the active flag, action mode, and proxy
        // binding must reflect now, not schedule time.
        let task = match self.store.get_task(task_id) {
            Ok(Some(task)) if task.active => task,
            Ok(_) => return JobStatus::Skipped,
            Err(e) => {
                return JobStatus::Finished(TaskOutcome::Error { message: e.to_string() })
            }
        };

        let account = match self.store.get_account(task.account_id) {
            Ok(Some(account)) => account,
            Ok(None) => {
                return JobStatus::Finished(TaskOutcome::Failed {
                    reason: format!("account {} is gone", task.account_id),
                })
            }
            Err(e) => {
                return JobStatus::Finished(TaskOutcome::Error { message: e.to_string() })
            }
        };

        let bundle = match decode_bundle(&account.credential) {
            Ok(bundle) => bundle,
            Err(e) => {
                return JobStatus::Finished(TaskOutcome::Failed { reason: e.to_string() })
            }
        };

        let proxy = match self.store.proxy_for_account(account.id) {
            Ok(Some(proxy)) => proxy,
            Ok(None) => {
                return JobStatus::Finished(TaskOutcome::Failed {
                    reason: format!("no proxy bound to account {}", account.id),
                })
            }
            Err(e) => {
                return JobStatus::Finished(TaskOutcome::Error { message: e.to_string() })
            }
        };

        let api = match self.clients.build(&bundle, &proxy) {
            Ok(api) => api,
            Err(e) => {
                return JobStatus::Finished(TaskOutcome::Failed { reason: e.to_string() })
            }
        };

        JobStatus::Finished(self.engine.process_task(&task, api.as_ref()).await)
    }
}


#[cfg(test)]
mod tests {
    use super::tests_support::{slow_factory, valid_bundle};
    use super::*;
    use guardpost_channels::NullNotifier;
    use guardpost_core::error::GuardPostError;
    use guardpost_core::types::{ActionMode, ProxyStatus};
    use std::time::Duration;

    /// Factory that refuses to build, for fault-isolation tests.
    struct BrokenFactory;

    impl ClientFactory for BrokenFactory {
        fn build(
            &self,
            _bundle: &CredentialBundle,
            _proxy: &Proxy,
        ) -> Result<Box<dyn CommentApi>> {
            Err(GuardPostError::ExternalApi("factory exploded".into()))
        }
    }

    fn seed_task(store: &Store, bound_proxy: bool) -> i64 {
        let account = store
            .upsert_account_with_proxy(1, "fb-1", "acct", &valid_bundle(), None, &[])
            .unwrap();
        if bound_proxy {
            let proxy = store
                .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
                .unwrap();
            store.bind_proxy(proxy.id, account.id).unwrap();
        }
        store
            .create_task(account.id, "post-1", ActionMode::Track, false)
            .unwrap()
            .id
    }

    fn dispatcher_with(
        store: Arc<Store>,
        factory: Arc<dyn ClientFactory>,
        concurrency: usize,
    ) -> Dispatcher {
        Dispatcher::new(store, Arc::new(NullNotifier), factory, concurrency)
    }

    #[tokio::test]
    async fn missing_and_inactive_tasks_are_silent_no_ops() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let factory = slow_factory(Duration::ZERO);
        let dispatcher = dispatcher_with(store.clone(), factory, 5);

        assert!(matches!(dispatcher.run_job(404).await, JobStatus::Skipped));

        let task_id = seed_task(&store, true);
        store.set_task_active(task_id, false).unwrap();
        assert!(matches!(dispatcher.run_job(task_id).await, JobStatus::Skipped));
    }

    #[tokio::test]
    async fn unbound_account_fails_without_touching_checkpoint() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let task_id = seed_task(&store, false);
        let factory = slow_factory(Duration::ZERO);
        let dispatcher = dispatcher_with(store.clone(), factory, 5);

        match dispatcher.run_job(task_id).await {
            JobStatus::Finished(TaskOutcome::Failed { reason }) => {
                assert!(reason.contains("no proxy bound"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
        assert!(store.get_task(task_id).unwrap().unwrap().last_checked.is_none());
    }

    #[tokio::test]
    async fn malformed_credential_is_a_failed_outcome() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let account = store
            .upsert_account_with_proxy(1, "fb-1", "acct", "not-base64!", None, &[])
            .unwrap();
        let proxy = store
            .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
            .unwrap();
        store.bind_proxy(proxy.id, account.id).unwrap();
        let task_id = store
            .create_task(account.id, "post-1", ActionMode::Track, false)
            .unwrap()
            .id;

        let factory = slow_factory(Duration::ZERO);
        let dispatcher = dispatcher_with(store, factory, 5);
        match dispatcher.run_job(task_id).await {
            JobStatus::Finished(TaskOutcome::Failed { reason }) => {
                assert!(reason.contains("credential"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn factory_fault_is_contained_and_siblings_still_run() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let task_id = seed_task(&store, true);
        let dispatcher = dispatcher_with(store.clone(), Arc::new(BrokenFactory), 5);

        match dispatcher.run_job(task_id).await {
            JobStatus::Finished(TaskOutcome::Failed { reason }) => {
                assert!(reason.contains("factory exploded"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
        // Dispatcher survives — the same job can run again.
        assert!(matches!(
            dispatcher.run_job(task_id).await,
            JobStatus::Finished(TaskOutcome::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn at_most_one_execution_per_task_id() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let task_id = seed_task(&store, true);
        let factory = slow_factory(Duration::from_millis(100));
        let dispatcher = Arc::new(dispatcher_with(store, factory.clone(), 5));

        let first = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.run_job(task_id).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = dispatcher.run_job(task_id).await;
        assert!(matches!(second, JobStatus::AlreadyRunning));

        let first = first.await.unwrap();
        assert!(matches!(first, JobStatus::Finished(TaskOutcome::NoNewComments)));
        assert_eq!(factory.fetch_count(), 1);
    }

    #[tokio::test]
    async fn concurrency_is_bounded_at_the_configured_width() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let account = store
            .upsert_account_with_proxy(1, "fb-1", "acct", &valid_bundle(), None, &[])
            .unwrap();
        let proxy = store
            .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
            .unwrap();
        store.bind_proxy(proxy.id, account.id).unwrap();
        let mut task_ids = Vec::new();
        for i in 0..8 {
            task_ids.push(
                store
                    .create_task(account.id, &format!("post-{i}"), ActionMode::Track, false)
                    .unwrap()
                    .id,
            );
        }

        let factory = slow_factory(Duration::from_millis(30));
        let dispatcher = Arc::new(dispatcher_with(store, factory.clone(), 3));

        let jobs = task_ids
            .into_iter()
            .map(|id| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move { dispatcher.run_job(id).await })
            })
            .collect::<Vec<_>>();
        for job in jobs {
            assert!(matches!(
                job.await.unwrap(),
                JobStatus::Finished(TaskOutcome::NoNewComments)
            ));
        }
        assert_eq!(factory.fetch_count(), 8);
        assert!(factory.max_in_flight() <= 3);
    }
}
