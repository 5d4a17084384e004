//! Fan-out, reduction depth, determinism and size accounting

use dagprep::store::{BlockStore, MemoryBlockStore};
use dagprep::tree::node::{Node, NodeBody, NodeHandle, NodeKind};
use dagprep::tree::packer::Packer;
use dagprep::types::ContentId;
use proptest::prelude::*;

fn leaves_of(sizes: &[usize]) -> Vec<Node> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, &size)| {
            let mut data = vec![(i % 251) as u8; size];
            data.extend_from_slice(&(i as u32).to_le_bytes());
            Node::leaf(data).unwrap()
        })
        .collect()
}

fn stored_handles(store: &MemoryBlockStore, leaves: &[Node]) -> Vec<NodeHandle> {
    leaves
        .iter()
        .map(|leaf| {
            store.put(leaf).unwrap();
            leaf.handle()
        })
        .collect()
}

/// Smallest L with k^L >= n
fn expected_levels(n: usize, k: usize) -> usize {
    let mut levels = 0;
    let mut capacity = 1usize;
    while capacity < n {
        capacity = capacity.saturating_mul(k);
        levels += 1;
    }
    levels
}

/// Walk everything under `id`, checking each parent's size against its links
fn check_sizes(store: &dyn BlockStore, id: &ContentId) -> Result<u64, TestCaseError> {
    let block = store.get(id).unwrap().unwrap();
    let body = NodeBody::decode(&block).unwrap();
    match body {
        NodeBody::Raw(ref data) => Ok(data.len() as u64),
        _ => {
            let mut total = 0;
            for link in body.links() {
                let child = check_sizes(store, &link.id)?;
                prop_assert_eq!(child, link.size);
                total += child;
            }
            prop_assert_eq!(total, body.size());
            Ok(total)
        }
    }
}

/// No parent holds more than max_links children, and parents are packed greedily
#[test]
fn test_fan_out_bound_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1usize..400, 2usize..20), |(count, max_links)| {
            let leaves = leaves_of(&vec![4; count]);
            let parents = Packer::new(max_links).unwrap().pack(&leaves).unwrap();

            prop_assert_eq!(parents.len(), count.div_ceil(max_links));
            for (i, parent) in parents.iter().enumerate() {
                prop_assert!(parent.links().len() <= max_links);
                prop_assert!(!parent.links().is_empty());
                if i + 1 < parents.len() {
                    prop_assert_eq!(parent.links().len(), max_links);
                }
                prop_assert_eq!(parent.kind(), NodeKind::File);
            }
            Ok(())
        })
        .unwrap();
}

/// Reduction always ends in one root after ceil(log_k n) passes
#[test]
fn test_reduction_depth_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1usize..600, 2usize..12), |(count, max_links)| {
            let store = MemoryBlockStore::new();
            let handles = stored_handles(&store, &leaves_of(&vec![1; count]));
            let reduction = Packer::new(max_links)
                .unwrap()
                .reduce(handles.clone(), &store)
                .unwrap();

            prop_assert_eq!(reduction.levels, expected_levels(count, max_links));
            if count == 1 {
                prop_assert_eq!(reduction.root, handles[0]);
            }
            Ok(())
        })
        .unwrap();
}

/// Same children give the same root; reordering distinct children changes it
#[test]
fn test_determinism_and_order_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(0usize..64, 2..60), 2usize..8),
            |(sizes, max_links)| {
                let packer = Packer::new(max_links).unwrap();
                let leaves = leaves_of(&sizes);

                let store = MemoryBlockStore::new();
                let first = packer.reduce(stored_handles(&store, &leaves), &store).unwrap();
                let fresh = MemoryBlockStore::new();
                let again = packer.reduce(stored_handles(&fresh, &leaves), &fresh).unwrap();
                prop_assert_eq!(first.root.id, again.root.id);

                let mut swapped = leaves.clone();
                swapped.swap(0, 1);
                let reordered = packer
                    .reduce(stored_handles(&store, &swapped), &store)
                    .unwrap();
                prop_assert_ne!(first.root.id, reordered.root.id);
                prop_assert_eq!(first.root.size, reordered.root.size);
                Ok(())
            },
        )
        .unwrap();
}

/// Every parent's size equals the sum of its children, down to the leaves
#[test]
fn test_size_accounting_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(0usize..300, 1..200), 2usize..10),
            |(sizes, max_links)| {
                let store = MemoryBlockStore::new();
                let leaves = leaves_of(&sizes);
                let expected: u64 = leaves.iter().map(|l| l.size()).sum();

                let reduction = Packer::new(max_links)
                    .unwrap()
                    .reduce(stored_handles(&store, &leaves), &store)
                    .unwrap();

                prop_assert_eq!(reduction.root.size, expected);
                prop_assert_eq!(check_sizes(&store, &reduction.root.id)?, expected);
                Ok(())
            },
        )
        .unwrap();
}
