//! Intrusive free lists.
//!
//! A free block's first word holds the address of the next free block; no
//! other byte of a free block is touched, and a block handed out to a caller
//! is never accessed at all. Every block is at least `ALIGNMENT` bytes, so
//! the next-pointer word always fits.

use core::ptr;

/// View of a free block. Only ever laid over memory that is currently free;
/// the single field is the embedded next pointer.
#[repr(C)]
pub struct FreeBlock {
    pub next: *mut FreeBlock,
}

/// Number of blocks reachable from `head`.
///
/// # Safety
///
/// `head` must be null or the start of a null-terminated chain of free
/// blocks.
pub unsafe fn chain_len(mut head: *mut FreeBlock) -> usize {
    let mut count = 0;
    while !head.is_null() {
        count += 1;
        head = unsafe { (*head).next };
    }
    count
}

/// Last block of a chain.
///
/// # Safety
///
/// `head` must be non-null and start a null-terminated chain of free blocks.
pub unsafe fn chain_tail(mut head: *mut FreeBlock) -> *mut FreeBlock {
    unsafe {
        while !(*head).next.is_null() {
            head = (*head).next;
        }
    }
    head
}

/// Counted singly linked list of free blocks, used for the per-thread
/// per-class lists. Every pointer pushed must be a free block of the list's
/// class; the list takes ownership until the block is popped again.
pub struct FreeList {
    head: *mut FreeBlock,
    len: usize,
}

impl FreeList {
    pub const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// # Safety
    ///
    /// `block` must point to a free block of this list's class and must not
    /// be on any list already.
    #[inline]
    pub unsafe fn push(&mut self, block: *mut FreeBlock) {
        unsafe { (*block).next = self.head };
        self.head = block;
        self.len += 1;
    }

    #[inline]
    pub fn pop(&mut self) -> *mut FreeBlock {
        let block = self.head;
        if !block.is_null() {
            self.head = unsafe { (*block).next };
            self.len -= 1;
        }
        block
    }

    /// Splice a chain of `count` blocks onto the front.
    ///
    /// # Safety
    ///
    /// `head` must be null or a null-terminated chain of `count` free
    /// blocks of this list's class, none of them on any list already.
    pub unsafe fn push_chain(&mut self, head: *mut FreeBlock, count: usize) {
        if head.is_null() || count == 0 {
            return;
        }
        unsafe {
            debug_assert_eq!(chain_len(head), count);
            let tail = chain_tail(head);
            (*tail).next = self.head;
        }
        self.head = head;
        self.len += count;
    }

    /// Keep the first `keep` blocks and detach the rest, returning the
    /// detached chain and its length. `keep` must be below the current
    /// length; `keep == 0` detaches everything.
    pub fn split_back(&mut self, keep: usize) -> (*mut FreeBlock, usize) {
        if keep == 0 {
            return self.take_all();
        }
        if keep >= self.len {
            return (ptr::null_mut(), 0);
        }
        let mut cut = self.head;
        unsafe {
            for _ in 1..keep {
                cut = (*cut).next;
            }
            let rest = (*cut).next;
            (*cut).next = ptr::null_mut();
            let count = self.len - keep;
            self.len = keep;
            (rest, count)
        }
    }

    /// Detach the whole list.
    pub fn take_all(&mut self) -> (*mut FreeBlock, usize) {
        let head = self.head;
        let count = self.len;
        self.head = ptr::null_mut();
        self.len = 0;
        (head, count)
    }
}
