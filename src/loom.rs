//! ### English
//! Concurrency shim: `std` types normally, `loom` types when built with `--cfg loom`.
//!
//! `UnsafeCell` exposes loom's closure API (`with` / `with_mut`) in both builds so loom can check
//! every access to the cell.
//!
//! ### 中文
//! 并发类型垫片：默认使用 `std` 类型，`--cfg loom` 构建时切换为 `loom` 类型。
//!
//! `UnsafeCell` 在两种构建下都提供 loom 的闭包式 API（`with` / `with_mut`），便于 loom 检查每次访问。

#[cfg(loom)]
pub(crate) use ::loom::cell::UnsafeCell;
#[cfg(loom)]
pub(crate) use ::loom::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

#[cfg(not(loom))]
#[derive(Debug)]
pub(crate) struct UnsafeCell<T>(std::cell::UnsafeCell<T>);

#[cfg(not(loom))]
impl<T> UnsafeCell<T> {
    #[inline]
    pub(crate) const fn new(value: T) -> Self {
        Self(std::cell::UnsafeCell::new(value))
    }

    #[inline]
    pub(crate) fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
        f(self.0.get())
    }

    #[inline]
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
        f(self.0.get())
    }
}
