//! ### English
//! A dedicated consumer thread on top of [`LocklessQueue`].
//!
//! Any number of [`Submitter`]s push values; one named thread owns the [`Consumer`] and hands
//! every value to a handler in queue order. The thread sleeps on a channel only when the queue is
//! empty; the queue itself never blocks.
//!
//! ### 中文
//! 基于 [`LocklessQueue`] 的专用消费线程。
//!
//! 任意数量的 [`Submitter`] push 值；一个具名线程持有 [`Consumer`]，并按队列顺序把每个值交给处理函数。
//! 只有队列为空时线程才会在 channel 上休眠；队列本身从不阻塞。

mod config;
mod submitter;

pub use config::WorkerConfig;
pub use submitter::Submitter;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use crossbeam_channel as channel;

use crate::error::WorkerError;
use crate::lockfree::{Backoff, Consumer, LocklessQueue};

use submitter::{Shared, WorkerMsg};

/// ### English
/// Summary returned by [`QueueWorker::shutdown`].
///
/// ### 中文
/// [`QueueWorker::shutdown`] 返回的汇总信息。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    /// ### English
    /// Number of values handed to the handler.
    ///
    /// ### 中文
    /// 交给处理函数的值的数量。
    pub processed: u64,
}

/// ### English
/// Owns the consumer thread. Dropping it performs the same shutdown as [`Self::shutdown`] and
/// discards the report.
///
/// ### 中文
/// 持有消费线程。drop 时执行与 [`Self::shutdown`] 相同的关闭流程，并丢弃汇总结果。
pub struct QueueWorker<T> {
    submitter: Submitter<T>,
    shared: Arc<Shared<T>>,
    name: String,
    thread: Option<thread::JoinHandle<u64>>,
}

impl<T: Send + 'static> QueueWorker<T> {
    /// ### English
    /// Spawns a worker over a fresh queue.
    ///
    /// ### 中文
    /// 基于新建队列启动一个 worker。
    pub fn spawn<F>(config: WorkerConfig, handler: F) -> Result<Self, WorkerError>
    where
        F: FnMut(T) + Send + 'static,
    {
        Self::spawn_on(Arc::new(LocklessQueue::new()), config, handler)
    }

    /// ### English
    /// Spawns a worker that consumes an existing queue.
    ///
    /// Fails with [`WorkerError::Queue`] if the queue already has a consumer. Values already in
    /// the queue are handled first.
    ///
    /// ### 中文
    /// 启动一个消费已有队列的 worker。
    ///
    /// 若该队列已有消费者则返回 [`WorkerError::Queue`]。队列中已有的值会先被处理。
    pub fn spawn_on<F>(
        queue: Arc<LocklessQueue<T>>,
        config: WorkerConfig,
        handler: F,
    ) -> Result<Self, WorkerError>
    where
        F: FnMut(T) + Send + 'static,
    {
        let consumer = queue.consumer()?;
        let (tx, rx) = channel::unbounded();
        let shared = Arc::new(Shared::new(queue, tx));

        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn({
                let shared = Arc::clone(&shared);
                let config = config.clone();
                move || run_worker(consumer, &shared, &rx, &config, handler)
            })
            .map_err(|source| WorkerError::Spawn {
                name: config.thread_name.clone(),
                source,
            })?;

        Ok(Self {
            submitter: Submitter::new(Arc::clone(&shared)),
            shared,
            name: config.thread_name,
            thread: Some(thread),
        })
    }
}

impl<T> QueueWorker<T> {
    /// ### English
    /// Returns a new producer handle.
    ///
    /// ### 中文
    /// 返回一个新的生产者句柄。
    pub fn submitter(&self) -> Submitter<T> {
        self.submitter.clone()
    }

    /// ### English
    /// Shorthand for `self.submitter().submit(value)`.
    ///
    /// ### 中文
    /// `self.submitter().submit(value)` 的简写。
    pub fn submit(&self, value: T) -> Result<(), T> {
        self.submitter.submit(value)
    }

    /// ### English
    /// Stops accepting values, lets the thread handle everything already accepted, and joins it.
    ///
    /// ### 中文
    /// 停止接收新值，让线程处理完所有已接收的值，然后 join 该线程。
    pub fn shutdown(mut self) -> Result<WorkerReport, WorkerError> {
        self.stop().unwrap_or(Ok(WorkerReport { processed: 0 }))
    }

    fn stop(&mut self) -> Option<Result<WorkerReport, WorkerError>> {
        let thread = self.thread.take()?;
        tracing::debug!(thread = %self.name, "queue worker shutdown requested");
        self.shared.close();

        Some(match thread.join() {
            Ok(processed) => Ok(WorkerReport { processed }),
            Err(_) => {
                tracing::warn!(thread = %self.name, "queue worker handler panicked");
                Err(WorkerError::Panicked {
                    name: self.name.clone(),
                })
            }
        })
    }
}

impl<T> Drop for QueueWorker<T> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl<T> fmt::Debug for QueueWorker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueWorker")
            .field("name", &self.name)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

/// ### English
/// Closes the submitters when the worker thread leaves `run_worker`, whether it returns or
/// unwinds out of a panicking handler.
///
/// ### 中文
/// worker 线程离开 `run_worker` 时（正常返回或处理函数 panic 展开）关闭所有 submitter。
struct RejectOnExit<'a, T>(&'a Shared<T>);

impl<T> Drop for RejectOnExit<'_, T> {
    fn drop(&mut self) {
        self.0.reject_submits();
    }
}

fn run_worker<T, F>(
    mut consumer: Consumer<T>,
    shared: &Shared<T>,
    rx: &channel::Receiver<WorkerMsg>,
    config: &WorkerConfig,
    mut handler: F,
) -> u64
where
    F: FnMut(T),
{
    tracing::debug!(thread = %config.thread_name, "queue worker started");
    let _reject_on_exit = RejectOnExit(shared);
    let mut processed = 0u64;
    let mut backoff = Backoff::with_spin_limit(config.spin_limit);

    loop {
        // Cleared before draining: a submit that misses this drain observes `false` and wakes us.
        shared.pending.swap(false, Ordering::SeqCst);
        for value in consumer.drain() {
            handler(value);
            processed += 1;
        }

        backoff.reset();
        while consumer.is_empty() && backoff.steps() < config.idle_spins {
            backoff.snooze();
        }
        if !consumer.is_empty() {
            continue;
        }

        match rx.recv() {
            Ok(WorkerMsg::Wake) => {}
            Ok(WorkerMsg::Shutdown) | Err(channel::RecvError) => break,
        }
    }

    // Every accepted submit finished publishing before `Shutdown` was sent.
    for value in consumer.drain() {
        handler(value);
        processed += 1;
    }
    tracing::info!(thread = %config.thread_name, processed, "queue worker stopped");
    processed
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[test]
    fn handles_values_in_submit_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = QueueWorker::spawn(WorkerConfig::default(), {
            let seen = Arc::clone(&seen);
            move |value: u32| seen.lock().unwrap().push(value)
        })
        .unwrap();

        for i in 0..100 {
            worker.submit(i).unwrap();
        }
        let report = worker.shutdown().unwrap();

        assert_eq!(report.processed, 100);
        assert_eq!(*seen.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn submit_after_shutdown_returns_value() {
        let worker = QueueWorker::spawn(WorkerConfig::default(), |_: String| {}).unwrap();
        let submitter = worker.submitter();
        worker.shutdown().unwrap();

        assert!(submitter.is_closed());
        assert_eq!(submitter.submit("late".to_string()), Err("late".to_string()));
    }

    #[test]
    fn spawn_on_claimed_queue_fails() {
        let queue = Arc::new(LocklessQueue::<u8>::new());
        let _consumer = queue.consumer().unwrap();

        let err = QueueWorker::spawn_on(queue, WorkerConfig::default(), |_| {}).unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Queue(crate::QueueError::ConsumerClaimed)
        ));
    }

    #[test]
    fn spawn_on_handles_prefilled_values_first() {
        let queue = Arc::new(LocklessQueue::new());
        queue.push(1);
        queue.push(2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = QueueWorker::spawn_on(queue, WorkerConfig::default().with_idle_spins(0), {
            let seen = Arc::clone(&seen);
            move |value: i32| seen.lock().unwrap().push(value)
        })
        .unwrap();
        worker.submit(3).unwrap();

        assert_eq!(worker.shutdown().unwrap().processed, 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn handler_panic_is_reported() {
        let worker = QueueWorker::spawn(
            WorkerConfig::default().with_thread_name("panicky"),
            |value: u8| {
                if value == 2 {
                    panic!("boom");
                }
            },
        )
        .unwrap();
        worker.submit(1).unwrap();
        worker.submit(2).unwrap();

        match worker.shutdown() {
            Err(WorkerError::Panicked { name }) => assert_eq!(name, "panicky"),
            other => panic!("expected panic report, got {other:?}"),
        }
    }

    #[test]
    fn dead_worker_rejects_submits() {
        let worker = QueueWorker::spawn(WorkerConfig::default(), |_: u32| panic!("boom")).unwrap();
        let submitter = worker.submitter();
        submitter.submit(0).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !submitter.is_closed() {
            assert!(Instant::now() < deadline, "worker never closed after panicking");
            thread::sleep(Duration::from_millis(1));
        }

        let rejected = (1..=1000)
            .filter(|&value| submitter.submit(value) == Err(value))
            .count();
        assert_eq!(rejected, 1000);
        assert!(worker.shared.queue.is_empty());
        assert!(matches!(
            worker.shutdown(),
            Err(WorkerError::Panicked { .. })
        ));
    }

    #[test]
    fn clean_exit_closes_submitters() {
        let worker = QueueWorker::spawn(WorkerConfig::default(), |_: u32| {}).unwrap();
        let submitter = worker.submitter();
        assert!(!submitter.is_closed());

        worker.shutdown().unwrap();
        assert!(submitter.is_closed());
        assert_eq!(submitter.submit(9), Err(9));
    }

    #[test]
    fn drop_without_shutdown_handles_everything() {
        let seen = Arc::new(Mutex::new(0usize));
        {
            let worker = QueueWorker::spawn(WorkerConfig::default(), {
                let seen = Arc::clone(&seen);
                move |_: ()| *seen.lock().unwrap() += 1
            })
            .unwrap();
            for _ in 0..10 {
                worker.submit(()).unwrap();
            }
        }
        assert_eq!(*seen.lock().unwrap(), 10);
    }
}
