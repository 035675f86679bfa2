//! ### English
//! Waiting helper for the worker side: idle re-checks of an empty queue and the shutdown wait on
//! in-flight submitters. Queue operations never wait and never touch it.
//!
//! ### 中文
//! worker 侧的等待工具：空队列的空闲重查，以及 shutdown 时等待进行中的 submitter。
//! 队列操作本身从不等待，也不会使用它。

use std::thread;

/// ### English
/// Default number of spinning steps before each step yields the thread instead.
///
/// ### 中文
/// 默认的自旋步数；超过后每一步改为让出线程。
pub(crate) const SPIN_LIMIT: u32 = 64;

/// ### English
/// Cap on the spin-loop hints issued by a single step (`1 << MAX_SPIN_SHIFT`).
///
/// ### 中文
/// 单步最多发出的 spin-loop 提示次数上限（`1 << MAX_SPIN_SHIFT`）。
const MAX_SPIN_SHIFT: u32 = 4;

/// ### English
/// Step counter: the first `spin_limit` steps spin (growing up to 16 hints per step), later steps
/// yield.
///
/// ### 中文
/// 步数计数器：前 `spin_limit` 步自旋（每步提示次数逐步增长，最多 16 次），之后的步骤让出线程。
pub(crate) struct Backoff {
    step: u32,
    spin_limit: u32,
}

impl Backoff {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::with_spin_limit(SPIN_LIMIT)
    }

    /// ### English
    /// Creates a backoff whose first `spin_limit` steps spin.
    ///
    /// ### 中文
    /// 创建一个前 `spin_limit` 步为自旋的退避状态。
    #[inline]
    pub(crate) fn with_spin_limit(spin_limit: u32) -> Self {
        Self {
            step: 0,
            spin_limit,
        }
    }

    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.step >= self.spin_limit {
            thread::yield_now();
        } else {
            for _ in 0..1u32 << self.step.min(MAX_SPIN_SHIFT) {
                std::hint::spin_loop();
            }
        }
        self.step = self.step.saturating_add(1);
    }

    /// ### English
    /// Steps taken since creation or the last [`Self::reset`].
    ///
    /// ### 中文
    /// 自创建或上次 [`Self::reset`] 以来执行的步数。
    #[inline]
    pub(crate) fn steps(&self) -> u32 {
        self.step
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.step = 0;
    }
}
