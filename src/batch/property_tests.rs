//! Property-based tests for the batching group
//!
//! These tests use proptest to verify ordering and batch-size properties for
//! arbitrary submission sequences.

use crate::batch::buffer::{chunk, SharedBuffer};
use crate::batch::{Group, Options};
use crossbeam::channel::unbounded;
use proptest::prelude::*;
use std::time::Duration;

/// Properties of buffer detachment
mod buffer_properties {
    use super::*;

    proptest! {
        #[test]
        fn chunking_preserves_order_and_bounds(
            items in prop::collection::vec(any::<u32>(), 0..200),
            size in 1usize..20
        ) {
            let chunks = chunk(items.clone(), size);

            prop_assert_eq!(chunks.len(), items.len().div_ceil(size));
            for (i, c) in chunks.iter().enumerate() {
                prop_assert!(!c.is_empty());
                if i + 1 < chunks.len() {
                    prop_assert_eq!(c.len(), size);
                } else {
                    prop_assert!(c.len() <= size);
                }
            }
            let flat: Vec<u32> = chunks.into_iter().flatten().collect();
            prop_assert_eq!(flat, items);
        }

        #[test]
        fn size_flushes_then_tick_reproduce_submission_order(
            items in prop::collection::vec(any::<u16>(), 0..200),
            size in 1usize..20
        ) {
            let buffer = SharedBuffer::new(size);
            let mut batches = Vec::new();
            for item in &items {
                if buffer.push(*item).unwrap() {
                    batches.push(buffer.take_full().unwrap());
                }
            }
            if let Some(rest) = buffer.take_due() {
                batches.push(rest);
            }

            prop_assert_eq!(batches.len(), items.len().div_ceil(size));
            prop_assert!(batches.iter().all(|b| b.len() <= size));
            let flat: Vec<u16> = batches.into_iter().flatten().collect();
            prop_assert_eq!(flat, items);
        }
    }
}

/// Properties of a running group
mod group_properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn close_delivers_everything_in_order(
            items in prop::collection::vec(any::<u32>(), 0..300),
            size in 1usize..32
        ) {
            let (tx, rx) = unbounded();
            let group = Group::new(
                move |batch: Vec<u32>| {
                    let _ = tx.send(batch);
                },
                Options {
                    size,
                    interval: Duration::from_secs(60),
                    thread_name: None,
                },
            )
            .unwrap();

            for item in &items {
                group.submit(*item).unwrap();
            }
            group.close().unwrap();

            let batches: Vec<Vec<u32>> = rx.try_iter().collect();
            prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
            let flat: Vec<u32> = batches.into_iter().flatten().collect();
            prop_assert_eq!(flat, items);
        }
    }
}
