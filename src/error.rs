//! ### English
//! Error types for the consumer capability and the worker thread.
//!
//! Queue operations themselves never fail: "no data" is `None`, and allocation failure aborts.
//!
//! ### 中文
//! 消费者令牌与 worker 线程的错误类型。
//!
//! 队列操作本身不会失败：“无数据” 以 `None` 表示，分配失败直接 abort。

use std::io;

use thiserror::Error;

/// ### English
/// Errors reported by [`crate::LocklessQueue`] helpers.
///
/// ### 中文
/// [`crate::LocklessQueue`] 辅助接口返回的错误。
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// ### English
    /// A [`crate::Consumer`] for this queue is still alive.
    ///
    /// ### 中文
    /// 该队列的 [`crate::Consumer`] 仍然存活。
    #[error("queue already has an active consumer")]
    ConsumerClaimed,
}

/// ### English
/// Errors reported by [`crate::QueueWorker`].
///
/// ### 中文
/// [`crate::QueueWorker`] 返回的错误。
#[derive(Debug, Error)]
pub enum WorkerError {
    /// ### English
    /// The OS refused to create the consumer thread named `name`.
    ///
    /// ### 中文
    /// 操作系统拒绝创建名为 `name` 的消费线程。
    #[error("failed to spawn worker thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
    /// ### English
    /// The queue handed to [`crate::QueueWorker::spawn_on`] already has a consumer.
    ///
    /// ### 中文
    /// 传给 [`crate::QueueWorker::spawn_on`] 的队列已经有消费者。
    #[error(transparent)]
    Queue(#[from] QueueError),
    /// ### English
    /// The handler panicked; values still queued at that point were dropped unhandled.
    ///
    /// ### 中文
    /// 处理函数发生 panic；此时仍在队列中的值被丢弃、未被处理。
    #[error("worker thread `{name}` panicked")]
    Panicked { name: String },
}
