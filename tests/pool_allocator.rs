//! Integration tests for the fixed-block pool allocator

use core::mem::align_of;
use core::ptr::NonNull;
use std::sync::Arc;
use std::thread;

use rand::Rng;
use slabpool::PoolAllocator;

#[test]
fn basic_allocate_write_free() {
    let pool = PoolAllocator::new(128, 16);
    assert!(pool.is_initialized());

    let ptr = pool.allocate().expect("allocation failed");

    unsafe {
        // Write to the whole payload region.
        std::ptr::write_bytes(ptr.as_ptr(), 0x42, 128);
        assert_eq!(*ptr.as_ptr(), 0x42);
        assert_eq!(*ptr.as_ptr().add(127), 0x42);
    }

    pool.free(ptr);
}

#[test]
fn exactly_count_allocations_succeed() {
    let pool = PoolAllocator::new(32, 4);

    let ptrs: Vec<_> = (0..4).map(|_| pool.allocate().expect("within capacity")).collect();
    assert_eq!(pool.allocate(), None, "count+1-th allocation must be empty");
    assert!(pool.is_full());

    // Exhaustion is recoverable: one free, one more allocation.
    pool.free(ptrs[0]);
    let again = pool.allocate().expect("freed block is reusable");
    assert_eq!(again, ptrs[0]);

    pool.free(again);
    for &ptr in &ptrs[1..] {
        pool.free(ptr);
    }
    assert!(pool.is_empty());
}

#[test]
fn single_block_pool_returns_same_address() {
    let pool = PoolAllocator::new(64, 1);
    let p1 = pool.allocate().expect("first allocation");
    pool.free(p1);
    let p2 = pool.allocate().expect("second allocation");
    assert_eq!(p1, p2);
}

#[test]
fn reuse_is_lifo() {
    let pool = PoolAllocator::new(16, 8);
    let a = pool.allocate().unwrap();
    let b = pool.allocate().unwrap();

    pool.free(a);
    pool.free(b);

    // Most recently freed comes back first.
    assert_eq!(pool.allocate().unwrap(), b);
    assert_eq!(pool.allocate().unwrap(), a);
}

#[test]
fn payload_pointers_are_pointer_aligned() {
    // Odd payload sizes must not leak misalignment into the next slot.
    for payload in [1, 3, 7, 13, 64, 100] {
        let pool = PoolAllocator::new(payload, 8);
        while let Some(ptr) = pool.allocate() {
            assert_eq!(ptr.as_ptr() as usize % align_of::<*mut u8>(), 0);
        }
    }
}

#[test]
fn blocks_are_distinct_and_hold_their_bytes() {
    let pool = PoolAllocator::new(32, 16);

    let mut ptrs = Vec::new();
    for i in 0..10u8 {
        let ptr = pool.allocate().expect("allocation failed");
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), i, 32) };
        ptrs.push(ptr);
    }

    for i in 0..ptrs.len() {
        for j in (i + 1)..ptrs.len() {
            assert_ne!(ptrs[i], ptrs[j]);
        }
    }

    for (i, ptr) in ptrs.iter().enumerate() {
        unsafe {
            assert_eq!(*ptr.as_ptr(), i as u8);
            assert_eq!(*ptr.as_ptr().add(31), i as u8);
        }
    }

    for ptr in ptrs {
        pool.free(ptr);
    }
}

#[test]
fn zero_sized_construction_is_soft_and_permanent() {
    for (payload, count) in [(0, 16), (16, 0), (0, 0)] {
        let pool = PoolAllocator::new(payload, count);
        assert!(!pool.is_initialized());
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.block_size(), 0);
        assert_eq!(pool.free_blocks(), 0);
        assert!(pool.stats().is_none());

        // Freeing into an unready pool is a defined no-op.
        let mut local = 0u64;
        pool.free(NonNull::from(&mut local).cast());
    }
}

#[test]
fn accessors_track_occupancy() {
    let pool = PoolAllocator::new(48, 8);
    assert_eq!(pool.block_count(), 8);
    assert_eq!(pool.payload_size(), 48);
    assert_eq!(pool.capacity(), pool.block_size() * 8);
    assert_eq!(pool.free_blocks(), 8);
    assert!(pool.is_empty());

    let ptr = pool.allocate().unwrap();
    assert!(pool.contains(ptr.as_ptr()));
    assert!(!pool.contains(core::ptr::null()));
    assert_eq!(pool.free_blocks(), 7);
    assert_eq!(pool.allocated_blocks(), 1);

    let stats = pool.stats().unwrap();
    assert_eq!(stats.block_count, 8);
    assert_eq!(stats.free_blocks, 7);
    assert_eq!(stats.allocated_blocks, 1);
    assert_eq!(stats.used_bytes(), stats.block_size);

    pool.free(ptr);
    assert_eq!(pool.free_blocks(), 8);
}

#[test]
#[should_panic(expected = "pointer not from this pool")]
fn foreign_pointer_is_fatal() {
    let pool = PoolAllocator::new(64, 4);
    let mut stack_bytes = [0u8; 64];
    pool.free(NonNull::from(&mut stack_bytes).cast());
}

#[test]
#[should_panic(expected = "not aligned to a block boundary")]
fn misaligned_pointer_is_fatal() {
    let pool = PoolAllocator::new(64, 4);
    let ptr = pool.allocate().unwrap();
    // One byte into the payload is inside the buffer but off-boundary.
    let misaligned = unsafe { NonNull::new_unchecked(ptr.as_ptr().add(1)) };
    pool.free(misaligned);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "double free")]
fn double_free_is_fatal_in_debug() {
    let pool = PoolAllocator::new(64, 4);
    let ptr = pool.allocate().unwrap();
    pool.free(ptr);
    pool.free(ptr);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "pointer not from this pool")]
fn cross_pool_free_is_fatal() {
    let a = PoolAllocator::new(64, 4);
    let b = PoolAllocator::new(64, 4);
    let ptr = a.allocate().unwrap();
    b.free(ptr);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "canary overwritten")]
fn tail_overrun_is_fatal_in_debug() {
    // A 12-byte payload leaves no padding before the tail canary in the
    // debug block layout, so writing 16 bytes overruns exactly into it
    // while staying inside the slot.
    let pool = PoolAllocator::new(12, 4);
    let ptr = pool.allocate().unwrap();
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0xFF, 16) };
    pool.free(ptr);
}

#[test]
fn concurrent_allocate_free_cycles() {
    const THREADS: usize = 8;
    const ITERATIONS: usize = 500;
    const BLOCKS: usize = 64;

    let pool = Arc::new(PoolAllocator::new(64, BLOCKS));

    let handles: Vec<_> = (0..THREADS)
        .map(|thread_id| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let mut rng = rand::rng();
                for iteration in 0..ITERATIONS {
                    let tag = (thread_id * 31 + iteration) as u8;
                    let batch = rng.random_range(1..=4);

                    let mut held = Vec::new();
                    for _ in 0..batch {
                        // Exhaustion is fine under contention; take what we get.
                        if let Some(ptr) = pool.allocate() {
                            unsafe { std::ptr::write_bytes(ptr.as_ptr(), tag, 64) };
                            held.push(ptr);
                        }
                    }

                    // If another thread ever received one of our live
                    // blocks, the tag would have been overwritten.
                    for ptr in held {
                        unsafe {
                            assert_eq!(*ptr.as_ptr(), tag);
                            assert_eq!(*ptr.as_ptr().add(63), tag);
                        }
                        pool.free(ptr);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    // Everything was returned, so the pool recovers its full capacity.
    assert_eq!(pool.free_blocks(), BLOCKS);
    let refill: Vec<_> = (0..BLOCKS).map(|_| pool.allocate().expect("full capacity")).collect();
    assert_eq!(pool.allocate(), None);
    for ptr in refill {
        pool.free(ptr);
    }
}
