//! Thread cache: per-class free lists private to one thread.
//!
//! The hit path pops the head of a local list and touches no shared state.
//! A miss pulls a batch from the central cache, hands the first block to the
//! caller and keeps the surplus; a list pushed past the return threshold
//! gives half of itself back in a single central call.

use core::ptr;

use crate::central_cache::CentralCache;
use crate::free_list::{FreeBlock, FreeList};
use crate::page_cache::PageCache;
use crate::size_class;
use crate::{FREE_LIST_SIZE, PAGE_SIZE, RETURN_THRESHOLD};

pub struct ThreadCache {
    lists: [FreeList; FREE_LIST_SIZE],
}

impl ThreadCache {
    pub const fn new() -> Self {
        Self {
            lists: [const { FreeList::new() }; FREE_LIST_SIZE],
        }
    }

    /// Hand out one block of the class covering `size` bytes. Null only
    /// when the page tier cannot map memory. `size` must be at most
    /// `MAX_BYTES`.
    ///
    /// # Safety
    ///
    /// The returned block is raw pool memory owned by the caller until it
    /// is passed back to [`ThreadCache::deallocate`].
    #[inline]
    pub unsafe fn allocate(
        &mut self,
        size: usize,
        central: &CentralCache,
        pages: &PageCache,
    ) -> *mut u8 {
        let index = size_class::index_of(size);
        let block = self.lists[index].pop();
        if !block.is_null() {
            return block as *mut u8;
        }
        unsafe { self.fetch_from_central(index, central, pages) }
    }

    /// Take back a block previously handed out for `size` bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must come from an `allocate` of a size mapping to the same
    /// class, and must not be in any free list already.
    #[inline]
    pub unsafe fn deallocate(&mut self, ptr: *mut u8, size: usize, central: &CentralCache) {
        let index = size_class::index_of(size);
        let list = &mut self.lists[index];
        unsafe { list.push(ptr as *mut FreeBlock) };
        if list.len() > RETURN_THRESHOLD {
            unsafe { self.release_to_central(index, central) };
        }
    }

    /// Drain every class back to the central cache (thread exit).
    ///
    /// # Safety
    ///
    /// All cached blocks must still be free; afterwards the cache is empty
    /// and usable again.
    pub unsafe fn flush(&mut self, central: &CentralCache) {
        for index in 0..FREE_LIST_SIZE {
            let (head, count) = self.lists[index].take_all();
            if !head.is_null() {
                unsafe { central.return_range(head, count, index) };
            }
        }
    }

    /// Miss path: pull a batch for class `index` and keep the surplus.
    #[cold]
    unsafe fn fetch_from_central(
        &mut self,
        index: usize,
        central: &CentralCache,
        pages: &PageCache,
    ) -> *mut u8 {
        let size = size_class::class_size(index);
        let batch = batch_for(size);
        let (head, count) = unsafe { central.fetch_range(index, batch, pages) };
        if head.is_null() || count == 0 {
            return ptr::null_mut();
        }

        if count > 1 {
            unsafe {
                let rest = (*head).next;
                self.lists[index].push_chain(rest, count - 1);
            }
        }
        head as *mut u8
    }

    /// Return the back half of an overfull list in one central call, always
    /// keeping at least one block locally.
    unsafe fn release_to_central(&mut self, index: usize, central: &CentralCache) {
        let list = &mut self.lists[index];
        let keep = list.len() - list.len() / 2;
        let (head, count) = list.split_back(keep);
        if !head.is_null() {
            unsafe { central.return_range(head, count, index) };
        }
    }
}

/// Blocks fetched per refill: many small blocks per round, few large ones,
/// and never more than one page's worth.
fn batch_for(size: usize) -> usize {
    let base = match size {
        ..=16 => 64,
        ..=32 => 48,
        ..=64 => 32,
        ..=128 => 16,
        ..=256 => 8,
        ..=512 => 4,
        ..=1024 => 2,
        _ => 1,
    };
    base.min(PAGE_SIZE / size).max(1)
}

#[cfg(test)]
impl ThreadCache {
    fn list_len(&self, index: usize) -> usize {
        self.lists[index].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_env() -> (&'static CentralCache, &'static PageCache) {
        let central = Box::leak(Box::new(CentralCache::new()));
        let pages = Box::leak(Box::new(PageCache::new()));
        (central, pages)
    }

    fn make_cache() -> Box<ThreadCache> {
        Box::new(ThreadCache::new())
    }

    #[test]
    fn batch_schedule() {
        assert_eq!(batch_for(8), 64);
        assert_eq!(batch_for(16), 64);
        assert_eq!(batch_for(24), 48);
        assert_eq!(batch_for(64), 32);
        assert_eq!(batch_for(128), 16);
        assert_eq!(batch_for(256), 8);
        assert_eq!(batch_for(512), 4);
        assert_eq!(batch_for(1024), 2);
        assert_eq!(batch_for(2048), 1);
        // The one-page cap, then the floor of one.
        assert_eq!(batch_for(4096), 1);
        assert_eq!(batch_for(256 * 1024), 1);
    }

    #[test]
    fn allocate_and_deallocate() {
        let (central, pages) = make_test_env();
        let mut tc = make_cache();
        unsafe {
            let ptr = tc.allocate(8, central, pages);
            assert!(!ptr.is_null());
            tc.deallocate(ptr, 8, central);
        }
    }

    #[test]
    fn freed_block_is_reused_first() {
        let (central, pages) = make_test_env();
        let mut tc = make_cache();
        unsafe {
            let p1 = tc.allocate(24, central, pages);
            assert!(!p1.is_null());
            tc.deallocate(p1, 24, central);
            let p2 = tc.allocate(24, central, pages);
            assert_eq!(p1, p2);
            tc.deallocate(p2, 24, central);
        }
    }

    #[test]
    fn refill_keeps_surplus_locally() {
        let (central, pages) = make_test_env();
        let mut tc = make_cache();
        let index = size_class::index_of(8);
        unsafe {
            let ptr = tc.allocate(8, central, pages);
            assert!(!ptr.is_null());
            // One batch fetched, one block handed out.
            assert_eq!(tc.list_len(index), batch_for(8) - 1);
            tc.deallocate(ptr, 8, central);
        }
    }

    #[test]
    fn overflow_returns_half() {
        let (central, pages) = make_test_env();
        let mut tc = make_cache();
        let index = size_class::index_of(32);
        unsafe {
            let ptrs: Vec<*mut u8> = (0..100).map(|_| tc.allocate(32, central, pages)).collect();
            assert!(ptrs.iter().all(|p| !p.is_null()));
            for p in ptrs {
                tc.deallocate(p, 32, central);
            }
            // Every overflow past the threshold halved the list.
            assert!(tc.list_len(index) <= RETURN_THRESHOLD);
            assert!(tc.list_len(index) > 0);
        }
    }

    #[test]
    fn flush_empties_every_class() {
        let (central, pages) = make_test_env();
        let mut tc = make_cache();
        unsafe {
            let mut live = Vec::new();
            for size in [8usize, 32, 128, 1024] {
                for _ in 0..10 {
                    live.push((tc.allocate(size, central, pages), size));
                }
            }
            for (p, size) in live {
                tc.deallocate(p, size, central);
            }
            tc.flush(central);
            for size in [8usize, 32, 128, 1024] {
                assert_eq!(tc.list_len(size_class::index_of(size)), 0);
            }

            // Flushed blocks are still reachable through the central cache.
            let ptr = tc.allocate(8, central, pages);
            assert!(!ptr.is_null());
            tc.deallocate(ptr, 8, central);
        }
    }

    #[test]
    fn mixed_classes_stay_separate() {
        let (central, pages) = make_test_env();
        let mut tc = make_cache();
        unsafe {
            let a = tc.allocate(8, central, pages);
            let b = tc.allocate(16, central, pages);
            tc.deallocate(a, 8, central);
            tc.deallocate(b, 16, central);
            assert_eq!(tc.list_len(size_class::index_of(8)), batch_for(8));
            assert_eq!(tc.list_len(size_class::index_of(16)), batch_for(16));
        }
    }
}
