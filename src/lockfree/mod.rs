//! ### English
//! Lock-free primitives of this crate.
//!
//! These are designed for hot paths: producers never take a lock, and the single consumer never
//! waits on a producer.
//!
//! ### 中文
//! 本 crate 的无锁原语。
//!
//! 面向热路径设计：生产者从不加锁，单消费者也从不等待生产者。
mod backoff;
mod consumer;
mod queue;

pub(crate) use backoff::{Backoff, SPIN_LIMIT};
pub use consumer::{Consumer, Drain};
pub use queue::LocklessQueue;
