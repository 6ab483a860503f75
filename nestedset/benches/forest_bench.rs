use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use nestedset::{prelude::*, processes::tests::ForestBuilder};

/// A complete binary tree of the given depth, ids in breadth-first order starting at 1
fn binary_tree(depth: u32) -> MemoryNodeStore {
    let mut store = MemoryNodeStore::new();
    let mut builder = ForestBuilder::new(&mut store, TreeConfig::default());
    builder.root(1);
    for id in 2..(1u64 << (depth + 1)) {
        builder.child(id, id / 2);
    }
    store
}

/// bench inserting a leaf at the far left of the tree, which shifts every row
pub fn insert_benchmark(c: &mut Criterion) {
    let store = binary_tree(9);
    c.bench_function("insert_as_first_child_of (1023 nodes)", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                let mut writer = TreeWriter::new(&mut store, TreeConfig::default());
                black_box(writer.insert_as_first_child_of(Node::new(u64::MAX), &Node::new(512)).unwrap())
            },
            BatchSize::SmallInput,
        )
    });
}

/// bench relocating a 127-node subtree from the left to the right edge of the tree
pub fn move_benchmark(c: &mut Criterion) {
    let store = binary_tree(9);
    c.bench_function("move_as_last_child_of (127 node subtree)", |b| {
        b.iter_batched(
            || store.clone(),
            |mut store| {
                let mut writer = TreeWriter::new(&mut store, TreeConfig::default());
                black_box(writer.move_as_last_child_of(&Node::new(8), &Node::new(1023)).unwrap())
            },
            BatchSize::SmallInput,
        )
    });
}

/// bench deriving levels and parents of a full tree
pub fn generate_fields_benchmark(c: &mut Criterion) {
    let store = binary_tree(9);
    let tree = TreeReader::new(&store, TreeConfig::default()).fetch_tree(None, 1).unwrap();
    c.bench_function("generate_additional_fields (1023 nodes)", |b| {
        b.iter_batched(|| tree.clone(), |mut tree| generate_additional_fields(black_box(&mut tree)), BatchSize::SmallInput)
    });
}

criterion_group!(benches, insert_benchmark, move_benchmark, generate_fields_benchmark);
criterion_main!(benches);
