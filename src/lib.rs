/// ### English
/// `lockless_queue` crate root.
/// The lock-free single-consumer/multi-producer queue lives under `lockfree`; `worker` runs a
/// dedicated consumer thread on top of it.
///
/// ### 中文
/// `lockless_queue` 的 crate 根。
/// 无锁单消费者/多生产者队列位于 `lockfree` 模块；`worker` 在其之上运行一个专用消费线程。
mod error;
mod lockfree;
mod loom;
mod worker;

pub use error::{QueueError, WorkerError};
pub use lockfree::{Consumer, Drain, LocklessQueue};
pub use worker::{QueueWorker, Submitter, WorkerConfig, WorkerReport};
