// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Property tests for the bump frame allocator
//! TEST_SCENARIOS:
//!   - bases_increase_and_ranges_are_disjoint(): monotonic, aligned, disjoint, zeroed
//!   - exhaustion_hits_first_overflowing_request(): first failure is exactly where
//!     the cumulative page count passes the arena size
//!   - boundary_allocation(): 2-page arena, allocate(2) then allocate(1) panics

mod support;

use proptest::prelude::*;
use support::HostArena;
use synapse::mm::{AllocError, PageAllocator, PAGE_SIZE};

proptest! {
    #[test]
    fn bases_increase_and_ranges_are_disjoint(requests in prop::collection::vec(1usize..=4, 1..12)) {
        let total: usize = requests.iter().sum();
        let arena = HostArena::new(total);
        let mut frames = arena.frames();

        let mut prev_end = arena.start().raw();
        for &pages in &requests {
            let base = frames.allocate(pages);
            prop_assert!(base.is_page_aligned());
            prop_assert!(base.raw() >= prev_end, "overlap at {}", base);
            prop_assert!(base.raw() + pages * PAGE_SIZE <= arena.end().raw());
            prop_assert!(arena.bytes(base, pages).iter().all(|&b| b == 0));
            prev_end = base.raw() + pages * PAGE_SIZE;
        }
        prop_assert_eq!(frames.remaining_pages(), 0);
    }

    #[test]
    fn exhaustion_hits_first_overflowing_request(
        arena_pages in 0usize..16,
        requests in prop::collection::vec(1usize..=5, 1..16),
    ) {
        let arena = HostArena::new(arena_pages);
        let mut frames = arena.frames();

        let mut used = 0;
        for &pages in &requests {
            let result = frames.try_allocate(pages);
            if used + pages > arena_pages {
                prop_assert_eq!(
                    result,
                    Err(AllocError::OutOfMemory { requested: pages, available: arena_pages - used })
                );
                break;
            }
            prop_assert!(result.is_ok());
            used += pages;
        }
    }
}

#[test]
fn boundary_allocation() {
    let arena = HostArena::new(2);
    let mut frames = arena.frames();
    assert_eq!(frames.allocate(2), arena.start());
    let overflow = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| frames.allocate(1)));
    assert!(overflow.is_err());
}

#[test]
#[should_panic(expected = "frame allocator: out of memory")]
fn empty_arena_is_fatal() {
    let arena = HostArena::new(0);
    arena.frames().allocate(1);
}
