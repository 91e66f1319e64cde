//! mempool: a three-tier thread-caching memory pool.
//!
//! Small requests (up to 256 KiB) are served from per-thread free lists with
//! no synchronization on the hit path. A miss refills the thread list in one
//! batch from a central cache sharded by size class under per-class spin
//! locks; the central cache in turn carves page spans obtained from a single
//! mutex-protected page cache backed by `mmap`. Requests above the cached
//! maximum bypass the pool entirely and go to the system allocator.
//!
//! # Usage
//!
//! ```
//! let p = mempool::allocate(64).unwrap();
//! unsafe { mempool::deallocate(p, 64) };
//! ```
//!
//! `deallocate` must be given the size that was requested at allocation
//! time (any size mapping to the same class is equivalent).

pub mod central_cache;
pub mod free_list;
pub mod page_cache;
pub mod pool;
pub mod size_class;
pub mod sync;
pub mod thread_cache;

/// Alignment granularity and smallest block size (bytes).
pub const ALIGNMENT: usize = 8;

/// Largest request served from the caches, inclusive. Anything bigger goes
/// straight to the system allocator.
pub const MAX_BYTES: usize = 256 * 1024;

/// Number of size classes: one per [`ALIGNMENT`] step up to [`MAX_BYTES`].
pub const FREE_LIST_SIZE: usize = MAX_BYTES / ALIGNMENT;

/// Page size used for span accounting (4 KiB).
pub const PAGE_SIZE: usize = 4096;

/// Pages provisioned per span for classes whose block size fits one.
pub const SPAN_PAGES: usize = 8;

/// Per-class thread list length that triggers a batch return to the
/// central cache.
pub const RETURN_THRESHOLD: usize = 64;

const _: () = assert!(ALIGNMENT.is_power_of_two());
// A free block's first word holds the next pointer, so the smallest block
// must be able to store one.
const _: () = assert!(ALIGNMENT >= core::mem::size_of::<usize>());
const _: () = assert!(PAGE_SIZE.is_power_of_two());
const _: () = assert!(MAX_BYTES % ALIGNMENT == 0);
const _: () = assert!(PAGE_SIZE % ALIGNMENT == 0);

pub use pool::{allocate, deallocate};
