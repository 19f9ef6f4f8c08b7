//! Multi-threaded stress tests for the pool strategy.

use kindalloc::{AllocConfig, AllocatorKind, Allocators, Block, FreeRange, LeakTracker};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 3;
const OPS: usize = 2_000;
const POOL: usize = 4 << 20;
const MAX_LIVE: usize = 64;

/// xorshift64; good enough to scramble the operation mix.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn stamp(block: Block, len: i32, tag: u8) {
    unsafe { std::ptr::write_bytes(block.as_ptr(), tag, len as usize) };
}

fn verify(block: Block, len: i32, tag: u8) {
    let bytes = unsafe { block.as_slice(len as usize) };
    assert!(bytes.iter().all(|&b| b == tag), "payload of {:?} was overwritten", block);
}

/// Interleaved alloc/realloc/free on the pool. Returns the blocks left live
/// together with their requested sizes.
fn churn<O: kindalloc::AllocObserver>(
    alloc: &Allocators<O>,
    seed: u64,
    mut live: Vec<(Block, i32)>,
) -> Vec<(Block, i32)> {
    let tag = seed as u8;
    let mut rng = Rng(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1);

    for _ in 0..OPS {
        let op = rng.below(4);
        if live.is_empty() || (op < 2 && live.len() < MAX_LIVE) {
            let len = 1 + rng.below(2048) as i32;
            if let Some(block) = alloc.alloc(AllocatorKind::Pool, len) {
                stamp(block, len, tag);
                live.push((block, len));
            }
        } else if op == 3 {
            let i = rng.below(live.len() as u64) as usize;
            let (block, len) = live[i];
            let new_len = 1 + rng.below(4096) as i32;
            match alloc.realloc(AllocatorKind::Pool, Some(block), new_len) {
                Some(moved) => {
                    verify(moved, len.min(new_len), tag);
                    stamp(moved, new_len, tag);
                    live[i] = (moved, new_len);
                }
                None => {
                    live.swap_remove(i);
                }
            }
        } else {
            let i = rng.below(live.len() as u64) as usize;
            let (block, len) = live.swap_remove(i);
            verify(block, len, tag);
            alloc.free(Some(block));
        }
    }
    live
}

fn assert_accounted<O: kindalloc::AllocObserver>(alloc: &Allocators<O>, live: &[(Block, i32)]) {
    let free: usize = alloc
        .pool_free_ranges(AllocatorKind::Pool)
        .iter()
        .map(|r| r.size as usize)
        .sum();
    let used: usize = live
        .iter()
        .map(|&(block, _)| alloc.usable_size(block) as usize + 16)
        .sum();
    assert_eq!(free + used, POOL);
    assert_eq!(alloc.stats().kind(AllocatorKind::Pool).live_bytes, used);
}

#[test]
fn test_pool_stress_keeps_free_list_consistent() {
    let alloc = Allocators::new(AllocConfig::default().with_capacity(AllocatorKind::Pool, POOL));
    alloc.init();

    let mut carried: Vec<Vec<(Block, i32)>> = vec![Vec::new(); THREADS];

    for round in 0..ROUNDS {
        let handles: Vec<_> = carried
            .drain(..)
            .enumerate()
            .map(|(t, live)| {
                let alloc = alloc.clone();
                let seed = (round * THREADS + t + 1) as u64;
                // Blocks carry the tag of the thread that wrote them.
                let live = live
                    .into_iter()
                    .map(|(block, len)| {
                        stamp(block, len, seed as u8);
                        (block, len)
                    })
                    .collect();
                thread::spawn(move || churn(&alloc, seed, live))
            })
            .collect();

        carried = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Quiescent point.
        let all: Vec<_> = carried.iter().flatten().copied().collect();
        assert_accounted(&alloc, &all);
    }

    for (block, _) in carried.into_iter().flatten() {
        alloc.free(Some(block));
    }
    assert_eq!(alloc.pool_free_ranges(AllocatorKind::Pool), vec![FreeRange::new(0, POOL as i32)]);
    assert_eq!(alloc.stats().kind(AllocatorKind::Pool).live_bytes, 0);
    alloc.shutdown();
}

#[test]
fn test_leak_tracking_under_contention() {
    let alloc = Allocators::with_leak_tracking(
        AllocConfig::default().with_capacity(AllocatorKind::Pool, POOL),
    );
    alloc.init();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let alloc = alloc.clone();
            thread::spawn(move || churn(&alloc, t as u64 + 100, Vec::new()))
        })
        .collect();
    let live: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_accounted(&alloc, &live);
    assert_eq!(alloc.observer().live_count(), live.len());

    // Leave every other block behind.
    let (leaked, freed): (Vec<_>, Vec<_>) = live
        .iter()
        .enumerate()
        .partition(|(i, _)| i % 2 == 0);
    for (_, (block, _)) in freed {
        alloc.free(Some(*block));
    }

    let report = alloc.shutdown();
    assert_eq!(report.len(), leaked.len());
    for (_, (block, _)) in leaked {
        assert!(report.contains(block.addr()));
    }
}

#[test]
fn test_general_and_pool_from_many_threads() {
    let alloc = Arc::new(Allocators::with_observer(
        AllocConfig::minimal(),
        LeakTracker::new(),
    ));
    alloc.init();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let alloc = Arc::clone(&alloc);
            thread::spawn(move || {
                for i in 0..500 {
                    let kind = if i % 2 == 0 { AllocatorKind::General } else { AllocatorKind::Pool };
                    let block = alloc.alloc(kind, 64).unwrap();
                    stamp(block, 64, t as u8);
                    let block = alloc.realloc(kind, Some(block), 256).unwrap();
                    verify(block, 64, t as u8);
                    alloc.free(Some(block));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(alloc.observer().live_count(), 0);
    assert!(alloc.shutdown().is_empty());
}
