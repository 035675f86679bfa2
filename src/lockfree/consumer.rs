//! ### English
//! Single-consumer capability for [`LocklessQueue`].
//!
//! ### 中文
//! [`LocklessQueue`] 的单消费者令牌。

use std::fmt;
use std::sync::Arc;

use super::LocklessQueue;

/// ### English
/// The one consumer of a shared queue.
///
/// - At most one exists per queue (see [`LocklessQueue::consumer`]).
/// - Not `Clone`; `pop` takes `&mut self`, so the token cannot be used from two threads at once.
/// - `Send`: it may be moved to the consumer thread.
///
/// ### 中文
/// 共享队列唯一的消费者。
///
/// - 每个队列最多存在一个（见 [`LocklessQueue::consumer`]）。
/// - 不可 `Clone`；`pop` 需要 `&mut self`，因此无法在两个线程上同时使用。
/// - 可 `Send`：可以移动到消费线程。
pub struct Consumer<T> {
    queue: Arc<LocklessQueue<T>>,
}

impl<T> Consumer<T> {
    #[inline]
    pub(super) fn new(queue: Arc<LocklessQueue<T>>) -> Self {
        Self { queue }
    }

    /// ### English
    /// Dequeues the oldest value, or `None` if nothing is available right now.
    ///
    /// ### 中文
    /// 出队最旧的值；当前无数据时返回 `None`。
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        // Holding the claimed token is the single-consumer guarantee.
        unsafe { self.queue.pop_unchecked() }
    }

    /// ### English
    /// Returns an iterator that pops until the queue has nothing available.
    ///
    /// Values pushed while draining are yielded too. Once it returns `None` it may yield again
    /// after further pushes (not fused).
    ///
    /// ### 中文
    /// 返回一个迭代器，持续 pop 直到队列暂无数据。
    ///
    /// drain 期间新 push 的值也会被产出。返回 `None` 后若有新的 push，仍可能再次产出（非 fused）。
    #[inline]
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { consumer: self }
    }

    /// ### English
    /// Advisory emptiness check, see [`LocklessQueue::is_empty`].
    ///
    /// ### 中文
    /// 建议性判空，见 [`LocklessQueue::is_empty`]。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// ### English
    /// The queue this token consumes from. Producers may push through it.
    ///
    /// ### 中文
    /// 该令牌所消费的队列；生产者可以通过它 push。
    #[inline]
    pub fn queue(&self) -> &Arc<LocklessQueue<T>> {
        &self.queue
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.queue.release_consumer();
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("queue", &self.queue)
            .finish()
    }
}

/// ### English
/// Iterator returned by [`Consumer::drain`].
///
/// ### 中文
/// [`Consumer::drain`] 返回的迭代器。
pub struct Drain<'a, T> {
    consumer: &'a mut Consumer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.consumer.pop()
    }
}
