//! The notification scheduler loop
//!
//! Each tick is an atomic compute-then-advance-marker step: the due set
//! is computed from the persisted marker, the marker is durably advanced
//! to `now`, and only then are deliveries attempted best-effort. A
//! subscriber whose window was already swept is never swept again, even
//! when the process crashes and restarts right after the advance.

use crate::delivery::MenuDelivery;
use crate::errors::PushError;
use crate::marker::MarkerStore;
use chrono::{DateTime, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use user_store::{CanteenId, UserId, UserStore};

pub struct PushScheduler {
    users: Arc<UserStore>,
    marker: Arc<dyn MarkerStore>,
    delivery: Arc<dyn MenuDelivery>,
    interval: Duration,
    /// In-process copy of the marker; authoritative between durable
    /// writes so a failing marker store cannot cause double delivery
    /// within one process lifetime.
    last_sweep: Mutex<Option<DateTime<Utc>>>,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PushScheduler {
    pub fn new(
        users: Arc<UserStore>,
        marker: Arc<dyn MarkerStore>,
        delivery: Arc<dyn MenuDelivery>,
        interval: Duration,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            users,
            marker,
            delivery,
            interval,
            last_sweep: Mutex::new(None),
            shutdown,
            handle: Mutex::new(None),
        }
    }

    /// Spawn the background loop.
    pub async fn start(self: &Arc<Self>) -> Result<(), PushError> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Err(PushError::AlreadyRunning);
        }

        let _ = self.shutdown.send(false);
        let mut shutdown = self.shutdown.subscribe();
        let scheduler = Arc::clone(self);

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match scheduler.tick(Utc::now()).await {
                            Ok(delivered) if delivered > 0 => {
                                debug!(delivered, "push tick completed");
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "push tick skipped"),
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        }));
        Ok(())
    }

    /// Signal shutdown and wait for the loop. In-flight deliveries of
    /// the current tick finish first.
    pub async fn stop(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            let _ = self.shutdown.send(true);
            if let Err(e) = handle.await {
                warn!(error = %e, "push scheduler task failed");
            }
        }
    }

    /// Sweep the due window ending at `now`. Returns the number of
    /// successful deliveries.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize, PushError> {
        let mut last_sweep = self.last_sweep.lock().await;

        let last = match *last_sweep {
            Some(at) => Some(at),
            None => self.marker.load().await,
        };
        let Some(last) = last else {
            // Bootstrap: create the marker; nothing is due yet
            self.marker.store(now).await;
            *last_sweep = Some(now);
            return Ok(0);
        };

        // A marker predating today would wrap the window across
        // midnight; reset it to the start of the day instead
        let window_start = if last.date_naive() == now.date_naive() {
            last.time()
        } else {
            NaiveTime::MIN
        };

        // Enumeration failure skips the tick without advancing the
        // marker, so the window is retried on the next tick
        let records = self.users.list_all().await?;

        let mut due: Vec<(UserId, Vec<CanteenId>)> = Vec::new();
        for record in records {
            let Some(at) = record.push_time() else {
                continue;
            };
            let favorites = record.favorites();
            if favorites.is_empty() {
                continue;
            }
            if at > window_start && at <= now.time() {
                due.push((record.id, favorites));
            }
        }

        // The at-most-once boundary: advance durably before delivering
        self.marker.store(now).await;
        *last_sweep = Some(now);
        drop(last_sweep);

        let mut delivered = 0;
        for (user, favorites) in due {
            let silent = self.users.is_push_silent(user).await;
            for canteen in favorites {
                match self.delivery.deliver(user, canteen, silent).await {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!(error = %e, "menu delivery failed"),
                }
            }
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeliveryError;
    use crate::marker::FilePushMarker;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use user_store::{FileUserBackend, StoreError, UserBackend, UserRecord};

    struct RecordingDelivery {
        sent: Mutex<Vec<(UserId, CanteenId, bool)>>,
        fail_for: Option<UserId>,
    }

    impl RecordingDelivery {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: None,
            }
        }

        fn failing_for(user: UserId) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: Some(user),
            }
        }
    }

    #[async_trait]
    impl MenuDelivery for RecordingDelivery {
        async fn deliver(
            &self,
            user: UserId,
            canteen: CanteenId,
            silent: bool,
        ) -> Result<(), DeliveryError> {
            if self.fail_for == Some(user) {
                return Err(DeliveryError::new(user, canteen, "chat not found"));
            }
            self.sent.lock().await.push((user, canteen, silent));
            Ok(())
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 23, h, m, 0).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    struct Fixture {
        users: Arc<UserStore>,
        marker: Arc<FilePushMarker>,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let backend = Arc::new(FileUserBackend::open(dir.path().join("users.json")));
            let users = Arc::new(UserStore::new(
                backend,
                Duration::from_millis(500),
                false,
            ));
            let marker = Arc::new(FilePushMarker::new(dir.path().join("lastpush.txt")));
            Self {
                users,
                marker,
                _dir: dir,
            }
        }

        fn scheduler(&self, delivery: Arc<RecordingDelivery>) -> PushScheduler {
            PushScheduler::new(
                self.users.clone(),
                self.marker.clone(),
                delivery,
                Duration::from_secs(20),
            )
        }
    }

    async fn subscribe(users: &UserStore, id: UserId, push: NaiveTime, favorites: &[CanteenId]) {
        for canteen in favorites {
            users.save_favorite(id, *canteen).await.unwrap();
        }
        users.enable_push(id, push).await.unwrap();
    }

    #[tokio::test]
    async fn test_exactly_once_across_ticks() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(10, 5), &[279]).await;
        fx.marker.store(at(9, 55)).await;

        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = fx.scheduler(delivery.clone());

        // 10:05 is outside (09:55, 10:00]
        assert_eq!(scheduler.tick(at(10, 0)).await.unwrap(), 0);
        assert_eq!(fx.marker.load().await, Some(at(10, 0)));

        // 10:05 is inside (10:00, 10:10]
        assert_eq!(scheduler.tick(at(10, 10)).await.unwrap(), 1);
        assert_eq!(fx.marker.load().await, Some(at(10, 10)));

        // Never again
        assert_eq!(scheduler.tick(at(10, 20)).await.unwrap(), 0);
        assert_eq!(delivery.sent.lock().await.as_slice(), &[(1, 279, false)]);
    }

    #[tokio::test]
    async fn test_crash_recovery_catch_up() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(10, 5), &[279]).await;
        fx.marker.store(at(10, 0)).await;

        // Restarted process: fresh scheduler reads the persisted marker
        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = fx.scheduler(delivery.clone());
        assert_eq!(scheduler.tick(at(10, 7)).await.unwrap(), 1);

        // Another restart right after must not re-deliver
        let delivery2 = Arc::new(RecordingDelivery::new());
        let scheduler2 = fx.scheduler(delivery2.clone());
        assert_eq!(scheduler2.tick(at(10, 9)).await.unwrap(), 0);
        assert!(delivery2.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_day_boundary_resets_window() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(0, 2), &[279]).await;

        // Marker from yesterday 23:58
        fx.marker
            .store(Utc.with_ymd_and_hms(2026, 8, 22, 23, 58, 0).unwrap())
            .await;

        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = fx.scheduler(delivery.clone());

        // Window on the new day is (00:00, 00:05], not a wrap from 23:58
        assert_eq!(scheduler.tick(at(0, 5)).await.unwrap(), 1);
        assert_eq!(scheduler.tick(at(0, 10)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_creates_marker_without_deliveries() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(10, 5), &[279]).await;

        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = fx.scheduler(delivery.clone());

        assert_eq!(scheduler.tick(at(10, 10)).await.unwrap(), 0);
        assert_eq!(fx.marker.load().await, Some(at(10, 10)));
    }

    #[tokio::test]
    async fn test_subscriber_without_favorites_is_not_due() {
        let fx = Fixture::new();
        fx.users.enable_push(1, time(10, 5)).await.unwrap();
        fx.marker.store(at(10, 0)).await;

        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = fx.scheduler(delivery.clone());
        assert_eq!(scheduler.tick(at(10, 10)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_one_delivery_per_favorite() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(10, 5), &[279, 280, 281]).await;
        fx.marker.store(at(10, 0)).await;

        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = fx.scheduler(delivery.clone());
        assert_eq!(scheduler.tick(at(10, 10)).await.unwrap(), 3);

        let sent = delivery.sent.lock().await;
        assert_eq!(sent.as_slice(), &[(1, 279, false), (1, 280, false), (1, 281, false)]);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_isolated_and_marker_advances() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(10, 5), &[279]).await;
        subscribe(&fx.users, 2, time(10, 6), &[280]).await;
        fx.marker.store(at(10, 0)).await;

        let delivery = Arc::new(RecordingDelivery::failing_for(1));
        let scheduler = fx.scheduler(delivery.clone());

        assert_eq!(scheduler.tick(at(10, 10)).await.unwrap(), 1);
        assert_eq!(delivery.sent.lock().await.as_slice(), &[(2, 280, false)]);
        // Best-effort once due: the failed subscriber is not retried
        assert_eq!(fx.marker.load().await, Some(at(10, 10)));
        assert_eq!(scheduler.tick(at(10, 20)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_silent_preference_is_passed_through() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(10, 5), &[279]).await;
        fx.users.set_push_silent(1, true).await.unwrap();
        fx.marker.store(at(10, 0)).await;

        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = fx.scheduler(delivery.clone());
        scheduler.tick(at(10, 10)).await.unwrap();

        assert_eq!(delivery.sent.lock().await.as_slice(), &[(1, 279, true)]);
    }

    /// Backend whose every operation fails, as if the database were down.
    struct UnavailableBackend;

    #[async_trait]
    impl UserBackend for UnavailableBackend {
        async fn fetch_user(&self, _: UserId) -> Result<Option<UserRecord>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("storage offline")))
        }

        async fn store_user(&self, _: &UserRecord) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("storage offline")))
        }

        async fn remove_user(&self, _: UserId) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("storage offline")))
        }

        async fn all_users(&self) -> Result<Vec<UserRecord>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("storage offline")))
        }
    }

    /// Marker store that never persists anything.
    struct AmnesiacMarker;

    #[async_trait]
    impl MarkerStore for AmnesiacMarker {
        async fn load(&self) -> Option<DateTime<Utc>> {
            None
        }

        async fn store(&self, _: DateTime<Utc>) {}
    }

    #[tokio::test]
    async fn test_enumeration_failure_skips_tick_without_marker_advance() {
        let fx = Fixture::new();
        fx.marker.store(at(10, 0)).await;

        let users = Arc::new(UserStore::new(
            Arc::new(UnavailableBackend),
            Duration::from_millis(500),
            false,
        ));
        let scheduler = PushScheduler::new(
            users,
            fx.marker.clone(),
            Arc::new(RecordingDelivery::new()),
            Duration::from_secs(20),
        );

        assert!(matches!(
            scheduler.tick(at(10, 10)).await,
            Err(PushError::Store(_))
        ));
        // The window is retried on the next tick, not swept
        assert_eq!(fx.marker.load().await, Some(at(10, 0)));
    }

    #[tokio::test]
    async fn test_unpersistable_marker_never_redelivers_in_process() {
        let fx = Fixture::new();
        subscribe(&fx.users, 1, time(10, 5), &[279]).await;

        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = PushScheduler::new(
            fx.users.clone(),
            Arc::new(AmnesiacMarker),
            delivery.clone(),
            Duration::from_secs(20),
        );

        // Bootstrap, sweep, then stay quiet: the in-process copy keeps
        // the at-most-once guarantee even though nothing was persisted
        assert_eq!(scheduler.tick(at(10, 0)).await.unwrap(), 0);
        assert_eq!(scheduler.tick(at(10, 10)).await.unwrap(), 1);
        assert_eq!(scheduler.tick(at(10, 20)).await.unwrap(), 0);
        assert_eq!(delivery.sent.lock().await.as_slice(), &[(1, 279, false)]);
    }

    #[tokio::test]
    async fn test_start_and_stop_lifecycle() {
        let fx = Fixture::new();
        let delivery = Arc::new(RecordingDelivery::new());
        let scheduler = Arc::new(fx.scheduler(delivery));

        scheduler.start().await.unwrap();
        assert!(matches!(
            scheduler.start().await,
            Err(PushError::AlreadyRunning)
        ));
        scheduler.stop().await;

        // Restartable after a clean stop
        scheduler.start().await.unwrap();
        scheduler.stop().await;
    }
}
