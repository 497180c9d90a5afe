mod config;
mod correlation_map;
mod error;
mod guard;
mod handler;
mod listener;

pub use config::CorrelationConfig;
pub use correlation_map::CorrelationMap;
pub use correlation_map::SharedHandler;
pub use correlation_map::SweepReport;
pub use error::BoxError;
pub use error::CorrelationError;
pub use error::HandlerError;
pub use error::ListenerError;
pub use handler::ReplyHandler;
pub use listener::CorrelationListener;
pub use listener::ListenerHook;

#[cfg(test)]
mod tests {
    use crate::{
        CorrelationConfig, CorrelationListener, CorrelationMap, HandlerError, ListenerError,
        ReplyHandler, SharedHandler,
    };
    use al_core::TokioScheduler;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };
    use tokio::time::sleep;
    use tracing_subscriber::EnvFilter;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Handler counting how often it was timed out
    #[derive(Default)]
    struct TimeoutCounter(AtomicUsize);

    impl TimeoutCounter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl ReplyHandler for TimeoutCounter {
        fn on_timeout(&self, _: &str) -> Result<(), HandlerError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Listener recording every hook as `hook:id`
    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl Journal {
        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl CorrelationListener for Journal {
        fn on_put(&self, correlation_id: &str) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push(format!("put:{correlation_id}"));
            Ok(())
        }

        fn on_remove(&self, correlation_id: &str) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push(format!("remove:{correlation_id}"));
            Ok(())
        }

        fn on_eviction(&self, correlation_id: &str) -> Result<(), ListenerError> {
            self.0.lock().unwrap().push(format!("evict:{correlation_id}"));
            Ok(())
        }
    }

    fn same_handler(a: &SharedHandler, b: &SharedHandler) -> bool {
        std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
    }

    /// A 50ms entry polled every 10ms is timed out once by the 60ms mark
    #[tokio::test(start_paused = true)]
    async fn sweep_times_out_expired_entry() {
        init_tracing();
        let scheduler = TokioScheduler::current().unwrap();
        let map = CorrelationMap::new(&scheduler, 10).unwrap();
        let journal = Arc::new(Journal::default());
        map.set_listener(&journal);
        let handler = Arc::new(TimeoutCounter::default());

        map.put("id1", handler.clone(), 50).unwrap();
        sleep(Duration::from_millis(40)).await;
        assert_eq!(handler.count(), 0);
        assert!(map.contains_key("id1").unwrap());

        sleep(Duration::from_millis(25)).await;
        assert_eq!(handler.count(), 1);
        assert!(map.remove("id1").unwrap().is_none());

        // Nothing left to time out again
        sleep(Duration::from_millis(100)).await;
        assert_eq!(handler.count(), 1);
        assert_eq!(journal.entries(), vec!["put:id1", "evict:id1", "remove:id1"]);
    }

    /// A zero timeout survives any number of sweeps
    #[tokio::test(start_paused = true)]
    async fn zero_timeout_is_never_swept() {
        init_tracing();
        let scheduler = TokioScheduler::current().unwrap();
        let map = CorrelationMap::new(&scheduler, 10).unwrap();
        let counter = Arc::new(TimeoutCounter::default());
        let handler: SharedHandler = counter.clone();

        map.put("id2", handler.clone(), 0).unwrap();
        sleep(Duration::from_millis(500)).await;

        assert_eq!(counter.count(), 0);
        let removed = map.remove("id2").unwrap().unwrap();
        assert!(same_handler(&removed, &handler));
    }

    /// A reply arriving before the deadline suppresses the timeout
    #[tokio::test(start_paused = true)]
    async fn reply_before_deadline() {
        init_tracing();
        let scheduler = TokioScheduler::current().unwrap();
        let map = CorrelationMap::with_config(
            &scheduler,
            CorrelationConfig::from(Duration::from_millis(10)),
        )
        .unwrap();
        let journal = Arc::new(Journal::default());
        map.set_listener(&journal);
        let handler = Arc::new(TimeoutCounter::default());

        map.put("id3", handler.clone(), 50).unwrap();
        sleep(Duration::from_millis(20)).await;
        assert!(map.remove("id3").unwrap().is_some());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(handler.count(), 0);
        assert_eq!(journal.entries(), vec!["put:id3", "remove:id3"]);
    }

    /// After shutdown the remaining entries are neither swept nor drained
    #[tokio::test(start_paused = true)]
    async fn shutdown_leaves_entries() {
        init_tracing();
        let scheduler = TokioScheduler::current().unwrap();
        let map = CorrelationMap::new(&scheduler, 10).unwrap();
        let handler = Arc::new(TimeoutCounter::default());

        map.put("id4", handler.clone(), 20).unwrap();
        map.shutdown();
        assert!(map.is_shut_down());

        sleep(Duration::from_millis(200)).await;
        assert_eq!(handler.count(), 0);
        assert!(map.contains_key("id4").unwrap());

        // A manual sweep still works
        assert_eq!(map.purge().evicted(), ["id4".to_string()]);
        assert_eq!(handler.count(), 1);
    }

    /// Dropping the last handle to the map stops its sweep
    #[tokio::test(start_paused = true)]
    async fn dropped_map_stops_sweeping() {
        init_tracing();
        let scheduler = TokioScheduler::current().unwrap();
        let map = CorrelationMap::new(&scheduler, 10).unwrap();
        let handler = Arc::new(TimeoutCounter::default());
        map.put("id5", handler.clone(), 20).unwrap();
        drop(map);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(handler.count(), 0);
    }

    /// Replies and timeouts racing across worker threads, each id ends up on exactly one path
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn replies_and_timeouts_across_threads() {
        init_tracing();
        let scheduler = TokioScheduler::current().unwrap();
        let map = CorrelationMap::new(&scheduler, 5).unwrap();
        let journal = Arc::new(Journal::default());
        map.set_listener(&journal);

        let handlers: Vec<_> = (0..64)
            .map(|_| Arc::new(TimeoutCounter::default()))
            .collect();
        for (i, handler) in handlers.iter().enumerate() {
            map.put(format!("req-{i}"), handler.clone(), 20).unwrap();
        }

        let repliers: Vec<_> = (0..64)
            .filter(|i| i % 2 == 0)
            .map(|i| {
                let map = map.clone();
                tokio::spawn(async move { map.remove(&format!("req-{i}")).unwrap().is_some() })
            })
            .collect();
        let mut replied = 0;
        for replier in repliers {
            if replier.await.unwrap() {
                replied += 1;
            }
        }

        sleep(Duration::from_millis(200)).await;
        assert!(map.is_empty().unwrap());

        let timed_out: usize = handlers.iter().map(|handler| handler.count()).sum();
        assert_eq!(replied + timed_out, 64);
        assert!(handlers.iter().all(|handler| handler.count() <= 1));

        let entries = journal.entries();
        for (i, handler) in handlers.iter().enumerate() {
            let evictions = entries
                .iter()
                .filter(|entry| **entry == format!("evict:req-{i}"))
                .count();
            assert_eq!(evictions, handler.count(), "req-{i}");
        }
    }
}
