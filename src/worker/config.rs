//! ### English
//! Tuning knobs for [`super::QueueWorker`].
//!
//! ### 中文
//! [`super::QueueWorker`] 的可调参数。

use crate::lockfree::SPIN_LIMIT;

const DEFAULT_THREAD_NAME: &str = "lockless-queue-worker";
const DEFAULT_IDLE_SPINS: u32 = 16;

/// ### English
/// Worker thread configuration.
///
/// ### 中文
/// worker 线程配置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// ### English
    /// Name given to the consumer thread.
    ///
    /// ### 中文
    /// 消费线程的名称。
    pub thread_name: String,
    /// ### English
    /// Backoff steps that spin before switching to `yield_now()`.
    ///
    /// ### 中文
    /// 退避时在切换为 `yield_now()` 之前自旋的步数。
    pub spin_limit: u32,
    /// ### English
    /// Backoff steps spent re-checking an empty queue before blocking on the wake channel.
    /// `0` blocks immediately.
    ///
    /// ### 中文
    /// 队列为空时，在阻塞等待唤醒 channel 之前重复检查队列的退避步数。`0` 表示立即阻塞。
    pub idle_spins: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            spin_limit: SPIN_LIMIT,
            idle_spins: DEFAULT_IDLE_SPINS,
        }
    }
}

impl WorkerConfig {
    /// ### English
    /// Sets the consumer thread name.
    ///
    /// ### 中文
    /// 设置消费线程名称。
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// ### English
    /// Sets how many backoff steps spin before yielding.
    ///
    /// ### 中文
    /// 设置退避中让出线程之前的自旋步数。
    pub fn with_spin_limit(mut self, spin_limit: u32) -> Self {
        self.spin_limit = spin_limit;
        self
    }

    /// ### English
    /// Sets how many backoff steps an idle worker re-checks the queue before blocking.
    ///
    /// ### 中文
    /// 设置空闲 worker 在阻塞前重查队列的退避步数。
    pub fn with_idle_spins(mut self, idle_spins: u32) -> Self {
        self.idle_spins = idle_spins;
        self
    }
}
