//! ### English
//! Producer side of [`super::QueueWorker`].
//!
//! ### 中文
//! [`super::QueueWorker`] 的生产者端。

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel as channel;

use crate::lockfree::{Backoff, LocklessQueue};

/// ### English
/// Messages sent to the worker thread. Values travel through the queue, never the channel.
///
/// ### 中文
/// 发给 worker 线程的消息。值通过队列传递，而不是通过 channel。
pub(super) enum WorkerMsg {
    Wake,
    Shutdown,
}

/// ### English
/// State shared between submitters and the worker thread.
///
/// ### 中文
/// submitter 与 worker 线程之间共享的状态。
pub(super) struct Shared<T> {
    pub(super) queue: Arc<LocklessQueue<T>>,
    /// ### English
    /// Coalesced "values pending" flag: only the `false -> true` transition sends a wake.
    ///
    /// ### 中文
    /// 合并后的 “有待处理值” 标记：只有 `false -> true` 的切换才会发送唤醒。
    pub(super) pending: AtomicBool,
    /// ### English
    /// Number of submitters currently publishing into the queue.
    ///
    /// ### 中文
    /// 当前正在向队列发布的 submitter 数量。
    in_flight: AtomicUsize,
    /// ### English
    /// Close flag used to reject new values during shutdown.
    ///
    /// ### 中文
    /// 关闭标记：用于在 shutdown 期间拒绝新值。
    closed: AtomicBool,
    tx: channel::Sender<WorkerMsg>,
}

impl<T> Shared<T> {
    pub(super) fn new(queue: Arc<LocklessQueue<T>>, tx: channel::Sender<WorkerMsg>) -> Self {
        Self {
            queue,
            pending: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            tx,
        }
    }

    /// ### English
    /// Rejects further submits, waits for in-flight ones to finish publishing, then asks the
    /// worker thread to drain and exit.
    ///
    /// ### 中文
    /// 拒绝后续 submit，等待进行中的 submit 完成发布，然后通知 worker 线程 drain 并退出。
    pub(super) fn close(&self) {
        self.reject_submits();
        let _ = self.tx.send(WorkerMsg::Shutdown);
    }

    /// ### English
    /// Rejects further submits and waits until in-flight ones have finished publishing.
    ///
    /// Also run by the worker thread when it exits, including on unwind, so a dead worker never
    /// accepts values again.
    ///
    /// ### 中文
    /// 拒绝后续 submit，并等待进行中的 submit 完成发布。
    ///
    /// worker 线程退出时（包括 panic 展开时）也会执行，保证已退出的 worker 不再接收新值。
    pub(super) fn reject_submits(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut backoff = Backoff::new();
        while self.in_flight.load(Ordering::SeqCst) != 0 {
            backoff.snooze();
        }
    }
}

/// ### English
/// Cloneable producer handle for a [`super::QueueWorker`]. Usable from any number of threads.
///
/// ### 中文
/// [`super::QueueWorker`] 的可克隆生产者句柄，可被任意数量的线程使用。
pub struct Submitter<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Submitter<T> {
    pub(super) fn new(shared: Arc<Shared<T>>) -> Self {
        Self { shared }
    }

    /// ### English
    /// Enqueues one value for the worker.
    ///
    /// Returns `Err(value)` once shutdown has started or the worker thread has exited. Every `Ok`
    /// value is handled before the worker exits, unless the handler panics first (see
    /// [`crate::WorkerError::Panicked`]).
    ///
    /// ### 中文
    /// 为 worker 入队一个值。
    ///
    /// shutdown 开始或 worker 线程已退出后返回 `Err(value)`。所有返回 `Ok` 的值都会在 worker
    /// 退出前被处理，除非处理函数先发生 panic（见 [`crate::WorkerError::Panicked`]）。
    pub fn submit(&self, value: T) -> Result<(), T> {
        let shared = &*self.shared;
        if shared.closed.load(Ordering::Acquire) {
            return Err(value);
        }
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        if shared.closed.load(Ordering::SeqCst) {
            shared.in_flight.fetch_sub(1, Ordering::Release);
            return Err(value);
        }

        shared.queue.push(value);
        if !shared.pending.swap(true, Ordering::SeqCst) && shared.tx.send(WorkerMsg::Wake).is_err()
        {
            // The receiver only goes away after the exiting worker rejected submits and waited
            // for this one, so this is unreachable in practice; keep later submits out anyway.
            shared.closed.store(true, Ordering::SeqCst);
        }
        shared.in_flight.fetch_sub(1, Ordering::Release);
        Ok(())
    }

    /// ### English
    /// Whether shutdown has started or the worker thread has exited.
    ///
    /// ### 中文
    /// shutdown 是否已经开始，或 worker 线程是否已经退出。
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl<T> Clone for Submitter<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Submitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Submitter")
            .field("closed", &self.is_closed())
            .finish()
    }
}
