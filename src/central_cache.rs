//! Central cache: one shared free list per size class.
//!
//! Each class pairs an atomic list head with a spin lock. The lock
//! serialises structural edits; the head itself is published with release
//! stores so the new value is visible to the next acquirer. Refills pull a
//! whole span from the page cache and carve it into equal blocks threaded
//! through their first word.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use crate::free_list::{self, FreeBlock};
use crate::page_cache::PageCache;
use crate::size_class;
use crate::sync::SpinLock;
use crate::{FREE_LIST_SIZE, PAGE_SIZE, SPAN_PAGES};

pub struct CentralCache {
    heads: [AtomicPtr<FreeBlock>; FREE_LIST_SIZE],
    locks: [SpinLock; FREE_LIST_SIZE],
}

impl CentralCache {
    pub const fn new() -> Self {
        Self {
            heads: [const { AtomicPtr::new(ptr::null_mut()) }; FREE_LIST_SIZE],
            locks: [const { SpinLock::new() }; FREE_LIST_SIZE],
        }
    }

    /// Detach up to `batch` blocks of class `index`, refilling from the
    /// page cache when the list is empty. Returns the chain head and the
    /// actual count; `(null, 0)` on invalid arguments or mapping failure.
    ///
    /// # Safety
    ///
    /// The returned chain is raw pool memory; the caller takes ownership of
    /// every block on it.
    pub unsafe fn fetch_range(
        &self,
        index: usize,
        batch: usize,
        pages: &PageCache,
    ) -> (*mut FreeBlock, usize) {
        if index >= FREE_LIST_SIZE || batch == 0 {
            return (ptr::null_mut(), 0);
        }

        let _guard = self.locks[index].lock();

        let head = self.heads[index].load(Ordering::Relaxed);
        if head.is_null() {
            let size = size_class::class_size(index);
            let (base, span_bytes) = fetch_from_page_cache(size, pages);
            if base.is_null() {
                return (ptr::null_mut(), 0);
            }
            return unsafe { self.carve_span(index, base, span_bytes, size, batch) };
        }

        // Walk forward up to `batch` blocks, or to the end, and snip.
        let mut tail = head;
        let mut count = 1;
        unsafe {
            while count < batch && !(*tail).next.is_null() {
                tail = (*tail).next;
                count += 1;
            }
            let rest = (*tail).next;
            (*tail).next = ptr::null_mut();
            self.heads[index].store(rest, Ordering::Release);
        }
        (head, count)
    }

    /// Splice a chain of blocks back onto class `index`. The chain is
    /// walked to its natural null terminator; `count` is accounting only.
    ///
    /// # Safety
    ///
    /// `head` must be null or a null-terminated chain of free blocks that
    /// were all carved for class `index`.
    pub unsafe fn return_range(&self, head: *mut FreeBlock, count: usize, index: usize) {
        if head.is_null() || index >= FREE_LIST_SIZE {
            return;
        }

        let _guard = self.locks[index].lock();

        unsafe {
            debug_assert_eq!(free_list::chain_len(head), count);
            let tail = free_list::chain_tail(head);
            (*tail).next = self.heads[index].load(Ordering::Relaxed);
            self.heads[index].store(head, Ordering::Release);
        }
    }

    /// Carve a fresh span into `span_bytes / size` blocks. The first
    /// `min(batch, total)` become the returned chain, the remainder is
    /// published as the new list head. Trailing bytes that do not fit a
    /// whole block stay inside the span and are never handed out.
    ///
    /// Caller holds the class spin lock and the list head is null.
    unsafe fn carve_span(
        &self,
        index: usize,
        base: *mut u8,
        span_bytes: usize,
        size: usize,
        batch: usize,
    ) -> (*mut FreeBlock, usize) {
        let total = span_bytes / size;
        debug_assert!(total >= 1);
        let take = batch.min(total);

        unsafe {
            // Thread every block through its first word, in address order.
            for i in 1..total {
                let prev = base.add((i - 1) * size) as *mut FreeBlock;
                (*prev).next = base.add(i * size) as *mut FreeBlock;
            }
            (*(base.add((total - 1) * size) as *mut FreeBlock)).next = ptr::null_mut();

            if take < total {
                let split = base.add((take - 1) * size) as *mut FreeBlock;
                let rest = (*split).next;
                (*split).next = ptr::null_mut();
                self.heads[index].store(rest, Ordering::Release);
            }
        }
        (base as *mut FreeBlock, take)
    }
}

/// Obtain a span for blocks of `size` bytes: the fixed provisioning size
/// when a block fits one, otherwise exactly enough whole pages for a single
/// block. Returns the span base and its size in bytes.
fn fetch_from_page_cache(size: usize, pages: &PageCache) -> (*mut u8, usize) {
    let span_pages = if size <= SPAN_PAGES * PAGE_SIZE {
        SPAN_PAGES
    } else {
        size.div_ceil(PAGE_SIZE)
    };
    (pages.allocate_span(span_pages), span_pages * PAGE_SIZE)
}
