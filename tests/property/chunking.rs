//! Chunk coverage and count

use dagprep::tree::chunker::Chunker;
use proptest::prelude::*;

/// Chunks cover the input exactly, in order, all full but the last
#[test]
fn test_chunk_coverage_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(prop::collection::vec(any::<u8>(), 0..5000), 1usize..700),
            |(data, chunk_size)| {
                let chunks: Vec<_> = Chunker::new(data.as_slice(), chunk_size)
                    .collect::<Result<_, _>>()
                    .unwrap();

                prop_assert_eq!(chunks.len(), data.len().div_ceil(chunk_size));

                let mut offset = 0u64;
                for (i, chunk) in chunks.iter().enumerate() {
                    prop_assert_eq!(chunk.index, i as u64);
                    prop_assert_eq!(chunk.offset, offset);
                    if i + 1 < chunks.len() {
                        prop_assert_eq!(chunk.len(), chunk_size);
                    } else {
                        prop_assert!(!chunk.is_empty() && chunk.len() <= chunk_size);
                    }
                    offset += chunk.len() as u64;
                }

                let joined: Vec<u8> = chunks.into_iter().flat_map(|c| c.into_data()).collect();
                prop_assert_eq!(joined, data);
                Ok(())
            },
        )
        .unwrap();
}
