//! Task scheduler — one repeating registration per active task.
//!
//! Registrations are in-memory tokio timers keyed by task id; they do
//! not survive a restart, which is why `bootstrap` rebuilds them from
//! the store on process start.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use guardpost_core::error::Result;
use guardpost_engine::TaskOutcome;
use guardpost_store::Store;

use crate::dispatch::{Dispatcher, JobStatus};

/// Explicitly constructed scheduling service with an open/close
/// lifecycle. Injected into the hosting process — never a global.
pub struct ScheduleService {
    store: Arc<Store>,
    dispatcher: Arc<Dispatcher>,
    registrations: Mutex<HashMap<i64, JoinHandle<()>>>,
    default_interval: Duration,
    closed: AtomicBool,
}

impl ScheduleService {
    /// Open the service. `default_interval` is the polling cadence for
    /// `schedule`; 2 minutes in production configs.
    pub fn open(
        store: Arc<Store>,
        dispatcher: Arc<Dispatcher>,
        default_interval: Duration,
    ) -> Self {
        Self {
            store,
            dispatcher,
            registrations: Mutex::new(HashMap::new()),
            default_interval,
            closed: AtomicBool::new(false),
        }
    }

    /// Register a repeating trigger for `task_id` at the default
    /// cadence. Re-registering replaces the prior registration rather
    /// than duplicating it.
    pub fn schedule(&self, task_id: i64) {
        self.schedule_every(task_id, self.default_interval);
    }

    /// Register a repeating trigger with an explicit interval.
    pub fn schedule_every(&self, task_id: i64, interval: Duration) {
        if self.closed.load(Ordering::SeqCst) {
            tracing::warn!("Scheduler closed, refusing registration for task {task_id}");
            return;
        }

        let dispatcher = self.dispatcher.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // tokio intervals fire immediately; the first poll should
            // land one full period after registration.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // Jobs run detached so that unscheduling (which aborts
                // this loop) never interrupts an in-flight execution —
                // cancellation is forward-only.
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    match dispatcher.run_job(task_id).await {
                        JobStatus::Skipped | JobStatus::AlreadyRunning => {}
                        JobStatus::Finished(TaskOutcome::Error { message }) => {
                            tracing::error!("❌ Task {task_id}: {message}");
                        }
                        JobStatus::Finished(TaskOutcome::Failed { reason }) => {
                            tracing::error!("❌ Task {task_id}: {reason}");
                        }
                        JobStatus::Finished(outcome) => {
                            tracing::info!("✅ Task {task_id}: {outcome:?}");
                        }
                    }
                });
            }
        });

        let mut registrations = self.registrations.lock().unwrap();
        if let Some(old) = registrations.insert(task_id, handle) {
            old.abort();
            tracing::debug!("Replaced repeating registration for task {task_id}");
        }
    }

    /// Remove the registration for `task_id` if present; no-op
    /// otherwise. Returns whether a registration existed.
    pub fn unschedule(&self, task_id: i64) -> bool {
        let mut registrations = self.registrations.lock().unwrap();
        match registrations.remove(&task_id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Deactivate a task and eagerly cancel its registration, instead
    /// of letting it fire no-ops until the next bootstrap. The
    /// dispatcher's inactive-task check remains as the backstop.
    pub fn deactivate(&self, task_id: i64) -> Result<()> {
        self.store.set_task_active(task_id, false)?;
        self.unschedule(task_id);
        Ok(())
    }

    /// Rebuild registrations from the store after a restart. Returns
    /// how many tasks were scheduled.
    pub fn bootstrap(&self) -> Result<usize> {
        let tasks = self.store.list_active_tasks()?;
        for task in &tasks {
            self.schedule(task.id);
        }
        tracing::info!("🕒 Bootstrapped {} repeating registrations", tasks.len());
        Ok(tasks.len())
    }

    pub fn is_scheduled(&self, task_id: i64) -> bool {
        self.registrations.lock().unwrap().contains_key(&task_id)
    }

    pub fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    /// Stop all future triggers. In-flight jobs are left to finish.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut registrations = self.registrations.lock().unwrap();
        for (_, handle) in registrations.drain() {
            handle.abort();
        }
        tracing::info!("Scheduler closed");
    }
}

impl Drop for ScheduleService {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::SeqCst) {
            self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests_support::{slow_factory, valid_bundle};
    use guardpost_channels::NullNotifier;
    use guardpost_core::types::{ActionMode, ProxyStatus};

    fn service(store: Arc<Store>, interval_ms: u64) -> (ScheduleService, Arc<crate::dispatch::tests_support::SlowFactory>) {
        let factory = slow_factory(Duration::ZERO);
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            Arc::new(NullNotifier),
            factory.clone(),
            5,
        ));
        (
            ScheduleService::open(store, dispatcher, Duration::from_millis(interval_ms)),
            factory,
        )
    }

    fn seed_task(store: &Store, post: &str) -> i64 {
        let account = match store.get_account(1).unwrap() {
            Some(account) => account,
            None => store
                .upsert_account_with_proxy(1, "fb-1", "acct", &valid_bundle(), None, &[])
                .unwrap(),
        };
        if store.proxy_for_account(account.id).unwrap().is_none() {
            let proxy = store
                .add_proxy("10.0.0.1", 1080, None, None, ProxyStatus::Active)
                .unwrap();
            store.bind_proxy(proxy.id, account.id).unwrap();
        }
        store
            .create_task(account.id, post, ActionMode::Track, false)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn scheduling_twice_leaves_exactly_one_registration() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let task_id = seed_task(&store, "post-1");
        let (service, _) = service(store, 60_000);

        service.schedule(task_id);
        service.schedule(task_id);
        assert_eq!(service.registration_count(), 1);
        assert!(service.is_scheduled(task_id));

        assert!(service.unschedule(task_id));
        assert_eq!(service.registration_count(), 0);
        // Unscheduling an absent id is a no-op.
        assert!(!service.unschedule(task_id));
    }

    #[tokio::test]
    async fn registered_task_fires_repeatedly_until_unscheduled() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let task_id = seed_task(&store, "post-1");
        let (service, factory) = service(store, 15);

        service.schedule(task_id);
        tokio::time::sleep(Duration::from_millis(80)).await;
        service.unschedule(task_id);
        // Let a job dispatched by the final tick drain before sampling.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fired = factory.fetch_count();
        assert!(fired >= 2, "expected repeated polls, got {fired}");

        // No further triggers after unschedule.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(factory.fetch_count(), fired);
    }

    #[tokio::test]
    async fn bootstrap_schedules_only_active_tasks() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let t1 = seed_task(&store, "post-1");
        let t2 = seed_task(&store, "post-2");
        let t3 = seed_task(&store, "post-3");
        store.set_task_active(t2, false).unwrap();

        let (service, _) = service(store, 60_000);
        let scheduled = service.bootstrap().unwrap();
        assert_eq!(scheduled, 2);
        assert!(service.is_scheduled(t1));
        assert!(!service.is_scheduled(t2));
        assert!(service.is_scheduled(t3));
    }

    #[tokio::test]
    async fn deactivate_eagerly_cancels_the_registration() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let task_id = seed_task(&store, "post-1");
        let (service, _) = service(store.clone(), 60_000);

        service.schedule(task_id);
        service.deactivate(task_id).unwrap();
        assert!(!service.is_scheduled(task_id));
        assert!(!store.get_task(task_id).unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn closed_service_refuses_new_registrations() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let task_id = seed_task(&store, "post-1");
        let (service, _) = service(store, 60_000);

        service.schedule(task_id);
        service.close();
        assert_eq!(service.registration_count(), 0);
        service.schedule(task_id);
        assert_eq!(service.registration_count(), 0);
    }
}
