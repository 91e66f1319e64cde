//! Public facade: two entry points forwarded to the calling thread's cache.
//!
//! Requests above `MAX_BYTES` never touch the tiers; they go straight to
//! the system allocator and nothing is recorded for them. The thread cache
//! lives in TLS and flushes itself to the central cache when its thread
//! exits; while TLS is being torn down, both entry points fall back to the
//! central cache directly.

use core::alloc::Layout;
use core::ptr::NonNull;
use std::alloc;
use std::cell::UnsafeCell;

use crate::central_cache::CentralCache;
use crate::free_list::FreeBlock;
use crate::page_cache::PageCache;
use crate::size_class;
use crate::thread_cache::ThreadCache;
use crate::{ALIGNMENT, MAX_BYTES};

static PAGE_CACHE: PageCache = PageCache::new();
static CENTRAL_CACHE: CentralCache = CentralCache::new();

/// TLS cell around the thread cache. The destructor hands every cached
/// block back to the central cache so nothing is stranded at thread exit.
struct LocalCache(UnsafeCell<ThreadCache>);

impl Drop for LocalCache {
    fn drop(&mut self) {
        unsafe { self.0.get_mut().flush(&CENTRAL_CACHE) };
    }
}

thread_local! {
    static CACHE: LocalCache = const { LocalCache(UnsafeCell::new(ThreadCache::new())) };
}

/// Run `f` on this thread's cache. `None` once TLS is being torn down.
#[inline]
fn with_thread_cache<R>(f: impl FnOnce(&mut ThreadCache) -> R) -> Option<R> {
    CACHE
        .try_with(|cell| {
            // Sole accessor on this thread: no tier calls back into the
            // facade, so the closure cannot re-enter the cell.
            unsafe { f(&mut *cell.0.get()) }
        })
        .ok()
}

/// Allocate `size` bytes aligned to [`ALIGNMENT`].
///
/// A zero-size request is served as one minimum-size block. Requests above
/// [`MAX_BYTES`] are forwarded to the system allocator. `None` only when
/// memory cannot be obtained at all.
pub fn allocate(size: usize) -> Option<NonNull<u8>> {
    if size > MAX_BYTES {
        return allocate_large(size);
    }

    let ptr = with_thread_cache(|tc| unsafe { tc.allocate(size, &CENTRAL_CACHE, &PAGE_CACHE) })
        .unwrap_or_else(|| allocate_from_central(size));
    NonNull::new(ptr)
}

/// Release a block obtained from [`allocate`].
///
/// # Safety
///
/// `ptr` must come from [`allocate`] with a `size` mapping to the same
/// class as the original request, and must not be released twice.
pub unsafe fn deallocate(ptr: NonNull<u8>, size: usize) {
    if size > MAX_BYTES {
        unsafe { deallocate_large(ptr, size) };
        return;
    }

    let raw = ptr.as_ptr();
    let cached = with_thread_cache(|tc| unsafe { tc.deallocate(raw, size, &CENTRAL_CACHE) });
    if cached.is_none() {
        unsafe { deallocate_to_central(raw, size) };
    }
}

/// TLS-less allocate: pull a single block straight from the central tier.
#[cold]
fn allocate_from_central(size: usize) -> *mut u8 {
    let index = size_class::index_of(size);
    let (head, count) = unsafe { CENTRAL_CACHE.fetch_range(index, 1, &PAGE_CACHE) };
    if count == 0 {
        core::ptr::null_mut()
    } else {
        head as *mut u8
    }
}

/// TLS-less deallocate: hand the block to the central tier directly.
#[cold]
unsafe fn deallocate_to_central(raw: *mut u8, size: usize) {
    let index = size_class::index_of(size);
    let block = raw as *mut FreeBlock;
    unsafe {
        (*block).next = core::ptr::null_mut();
        CENTRAL_CACHE.return_range(block, 1, index);
    }
}

fn allocate_large(size: usize) -> Option<NonNull<u8>> {
    let layout = Layout::from_size_align(size, ALIGNMENT).ok()?;
    NonNull::new(unsafe { alloc::alloc(layout) })
}

unsafe fn deallocate_large(ptr: NonNull<u8>, size: usize) {
    let Ok(layout) = Layout::from_size_align(size, ALIGNMENT) else {
        return;
    };
    unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
}
