use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::Arc;

use crossbeam_utils::CachePadded;

use crate::error::QueueError;
use crate::loom::{AtomicBool, AtomicPtr, Ordering, UnsafeCell};

use super::Consumer;

/// ### English
/// One queued value. Owned by exactly one chain (push or pop) until `pop` extracts it.
///
/// ### 中文
/// 一个入队的值。在被 `pop` 取出之前，恰好归属于一条链（push 链或 pop 链）。
struct Entry<T> {
    value: T,
    /// ### English
    /// Written by the owning producer before its release CAS, then only by the consumer.
    ///
    /// ### 中文
    /// 由所属生产者在 release CAS 之前写入，之后只由消费者读写。
    next: UnsafeCell<*mut Entry<T>>,
}

impl<T> Entry<T> {
    #[inline]
    fn next(&self) -> *mut Entry<T> {
        self.next.with(|next| unsafe { *next })
    }

    #[inline]
    fn set_next(&self, next: *mut Entry<T>) {
        self.next.with_mut(|slot| unsafe { *slot = next });
    }
}

/// ### English
/// Unbounded lock-free SCMP queue (single-consumer, multi-producer).
///
/// - Producers prepend to a push chain (newest first) with a CAS loop.
/// - The consumer pops from a pop chain (oldest first); when it runs dry, the whole push chain is
///   taken with one atomic swap and reversed in place.
/// - FIFO with respect to the successful CAS of each `push`.
/// - Entries are never reused, so the CAS cannot observe a recycled pointer (no ABA).
///
/// Consumer access is through [`LocklessQueue::pop`] (`&mut self`), a [`Consumer`] token from
/// [`LocklessQueue::consumer`], or the unsafe [`LocklessQueue::pop_unchecked`].
///
/// ### 中文
/// 无界无锁 SCMP 队列（单消费者、多生产者）。
///
/// - 生产者通过 CAS 循环把元素插到 push 链头部（最新的在前）。
/// - 消费者从 pop 链弹出（最旧的在前）；pop 链为空时，用一次原子 swap 取走整条 push 链并原地反转。
/// - 顺序为各次 `push` 成功 CAS 的先后顺序（FIFO）。
/// - 节点从不复用，因此 CAS 不会看到被回收再分配的指针（无 ABA）。
///
/// 消费端入口：[`LocklessQueue::pop`]（`&mut self`）、通过 [`LocklessQueue::consumer`] 获取的
/// [`Consumer`] 令牌，或 unsafe 的 [`LocklessQueue::pop_unchecked`]。
pub struct LocklessQueue<T> {
    /// ### English
    /// Head of the push chain (newest first). Shared by all producers and the consumer's swap;
    /// padded so producer CAS traffic stays off the cache line of `pop_head`.
    ///
    /// ### 中文
    /// push 链头（最新的在前）。所有生产者与消费者的 swap 共同访问；
    /// 做了 cache line 填充，避免生产者的 CAS 流量与 `pop_head` 共享同一 cache line。
    push_head: CachePadded<AtomicPtr<Entry<T>>>,
    /// ### English
    /// Head of the pop chain (oldest first). Only the consumer follows it; atomic so that
    /// `is_empty` may load it from any thread.
    ///
    /// ### 中文
    /// pop 链头（最旧的在前）。只有消费者会沿链访问；使用原子类型仅为了让 `is_empty` 可在任意线程读取。
    pop_head: AtomicPtr<Entry<T>>,
    /// ### English
    /// Set while a [`Consumer`] token is alive.
    ///
    /// ### 中文
    /// [`Consumer`] 令牌存活期间置位。
    consumer_claimed: AtomicBool,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send> Send for LocklessQueue<T> {}
unsafe impl<T: Send> Sync for LocklessQueue<T> {}

impl<T> LocklessQueue<T> {
    /// ### English
    /// Creates an empty queue. Nothing is allocated until the first `push`.
    ///
    /// ### 中文
    /// 创建一个空队列。首次 `push` 之前不会分配内存。
    pub fn new() -> Self {
        Self {
            push_head: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
            pop_head: AtomicPtr::new(ptr::null_mut()),
            consumer_claimed: AtomicBool::new(false),
            _owns: PhantomData,
        }
    }

    /// ### English
    /// Enqueues one value. Callable from any number of threads; never blocks and never fails
    /// (allocation failure aborts the process).
    ///
    /// ### 中文
    /// 入队一个值。可被任意数量的线程并发调用；从不阻塞、从不失败（分配失败会直接终止进程）。
    #[inline]
    pub fn push(&self, value: T) {
        let entry = Box::into_raw(Box::new(Entry {
            value,
            next: UnsafeCell::new(ptr::null_mut()),
        }));

        // `prev` is never dereferenced here, only linked behind `entry`.
        let mut prev = self.push_head.load(Ordering::Relaxed);
        loop {
            // Unpublished until the CAS succeeds, so no other thread can see `entry` yet.
            unsafe { (*entry).set_next(prev) };
            match self.push_head.compare_exchange_weak(
                prev,
                entry,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(current) => prev = current,
            }
        }
    }

    /// ### English
    /// Dequeues the oldest value, or `None` if nothing is available right now.
    ///
    /// The exclusive borrow is the single-consumer guarantee.
    ///
    /// ### 中文
    /// 出队最旧的值；当前无可用数据时返回 `None`。
    ///
    /// 独占借用本身即保证了单消费者。
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        unsafe { self.pop_unchecked() }
    }

    /// ### English
    /// Dequeues the oldest value through a shared reference.
    ///
    /// # Safety
    /// At most one thread may be inside `pop_unchecked` (or [`Consumer::pop`]) for this queue at
    /// any time. Concurrent consumers race on the pop chain and cause use-after-free.
    ///
    /// ### 中文
    /// 通过共享引用出队最旧的值。
    ///
    /// # 安全性
    /// 任意时刻，对同一队列最多只能有一个线程处于 `pop_unchecked`（或 [`Consumer::pop`]）中。
    /// 并发消费者会在 pop 链上竞争，导致 use-after-free。
    pub unsafe fn pop_unchecked(&self) -> Option<T> {
        // Only the consumer stores `pop_head`, so this load sees our own last store.
        let head = self.pop_head.load(Ordering::Relaxed);
        if !head.is_null() {
            let entry = unsafe { Box::from_raw(head) };
            self.pop_head.store(entry.next(), Ordering::Release);
            return Some(entry.value);
        }

        // Acquire pairs with every producer's release CAS (RMWs extend the release sequence).
        let mut grabbed = self.push_head.swap(ptr::null_mut(), Ordering::Acquire);
        if grabbed.is_null() {
            return None;
        }

        let mut reversed: *mut Entry<T> = ptr::null_mut();
        let mut moved = 0usize;
        unsafe {
            loop {
                let next = (*grabbed).next();
                if next.is_null() {
                    break;
                }
                (*grabbed).set_next(reversed);
                reversed = grabbed;
                grabbed = next;
                moved += 1;
            }
        }
        if moved != 0 {
            tracing::trace!(moved, "transferred push chain to pop chain");
        }
        self.pop_head.store(reversed, Ordering::Release);

        // `grabbed` is now the oldest entry of the taken chain.
        let entry = unsafe { Box::from_raw(grabbed) };
        Some(entry.value)
    }

    /// ### English
    /// Advisory emptiness check from any thread.
    ///
    /// The two heads are loaded independently: `true` means both were observed empty at some
    /// instant during the call, not that the queue is still empty afterwards. Do not use it to
    /// skip a `pop`.
    ///
    /// ### 中文
    /// 任意线程可调用的建议性判空。
    ///
    /// 两个 head 分别独立读取：`true` 仅表示调用期间某一时刻两者都为空，并不保证返回后仍为空。
    /// 不要据此跳过 `pop`。
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.push_head.load(Ordering::Acquire).is_null()
            && self.pop_head.load(Ordering::Acquire).is_null()
    }

    /// ### English
    /// Claims the single consumer token for this queue.
    ///
    /// Returns [`QueueError::ConsumerClaimed`] while another token is alive; dropping the token
    /// releases the claim.
    ///
    /// ### 中文
    /// 获取该队列唯一的消费者令牌。
    ///
    /// 若已有令牌存活则返回 [`QueueError::ConsumerClaimed`]；令牌 drop 后释放占用。
    pub fn consumer(self: &Arc<Self>) -> Result<Consumer<T>, QueueError> {
        self.consumer_claimed
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| QueueError::ConsumerClaimed)?;
        Ok(Consumer::new(Arc::clone(self)))
    }

    #[inline]
    pub(super) fn release_consumer(&self) {
        self.consumer_claimed.store(false, Ordering::Release);
    }
}

impl<T> Default for LocklessQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LocklessQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocklessQueue")
            .field("is_empty", &self.is_empty())
            .field(
                "consumer_claimed",
                &self.consumer_claimed.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl<T> Drop for LocklessQueue<T> {
    fn drop(&mut self) {
        let dropped = free_chain(self.push_head.swap(ptr::null_mut(), Ordering::Acquire))
            + free_chain(self.pop_head.swap(ptr::null_mut(), Ordering::Acquire));
        if dropped != 0 {
            tracing::trace!(dropped, "dropped unconsumed values with queue");
        }
    }
}

fn free_chain<T>(mut head: *mut Entry<T>) -> usize {
    let mut freed = 0;
    while !head.is_null() {
        let entry = unsafe { Box::from_raw(head) };
        head = entry.next();
        freed += 1;
    }
    freed
}


#[cfg(loom)]
mod loom_tests {
    use super::*;
    use loom::thread;

    /// Two producers race on the push CAS while the consumer swaps the chain away.
    #[test]
    fn racing_producers_lose_nothing() {
        loom::model(|| {
            let queue = Arc::new(LocklessQueue::new());
            let mut consumer = queue.consumer().unwrap();

            let handles: Vec<_> = (0..2)
                .map(|p| {
                    let queue = queue.clone();
                    thread::spawn(move || queue.push(p))
                })
                .collect();

            let mut seen = Vec::new();
            seen.extend(consumer.pop());

            for h in handles {
                h.join().unwrap();
            }
            seen.extend(consumer.drain());

            seen.sort_unstable();
            assert_eq!(seen, vec![0, 1]);
            assert!(queue.is_empty());
        });
    }

    /// A producer keeps pushing while the consumer transfers and reverses the chain.
    #[test]
    fn transfer_keeps_producer_order() {
        loom::model(|| {
            let queue = Arc::new(LocklessQueue::new());
            let mut consumer = queue.consumer().unwrap();

            let producer = {
                let queue = queue.clone();
                thread::spawn(move || {
                    queue.push(1);
                    queue.push(2);
                })
            };

            let mut seen = Vec::new();
            seen.extend(consumer.pop());
            seen.extend(consumer.pop());

            producer.join().unwrap();
            seen.extend(consumer.drain());

            assert_eq!(seen, vec![1, 2]);
        });
    }
}
