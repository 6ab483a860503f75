use nestedset::{prelude::*, processes::tests::validate_forest};
use nestedset_core::{debug, log::try_init_logger};
use nestedset_database::{
    create_temp_db,
    prelude::{CachePolicy, ConnBuilder},
};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

const POSITIONS: [Position; 5] =
    [Position::Parent, Position::PrevSibling, Position::NextSibling, Position::FirstChild, Position::LastChild];

/// Applies `steps` random structural edits, validating the whole forest after each one
fn mutate_randomly<S: NodeStore>(forest: Forest<S>, seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut next_id = 1;
    let mut rejected = 0;

    for root in 0..3 {
        forest.create_root(None, Node::new(1000 + root)).unwrap();
    }

    for step in 0..steps {
        let nodes = {
            let reader = forest.reader();
            reader.fetch_roots().unwrap().into_iter().flat_map(|r| reader.fetch_tree(None, r.root_id).unwrap()).collect::<Vec<_>>()
        };
        let dest = nodes.choose(&mut rng).unwrap().clone();
        let node = nodes.choose(&mut rng).unwrap().clone();
        let position = *POSITIONS.choose(&mut rng).unwrap();

        let result = match rng.gen_range(0..10) {
            0..=4 => {
                next_id += 1;
                forest.insert(None, Node::new(next_id), &dest, position).map(Some)
            }
            5..=7 => forest.move_node(None, &node, &dest, position).map(Some),
            8 if nodes.len() > 20 && !node.is_root() => forest.delete(None, &node).map(|_| None),
            _ => forest.make_root(None, &node, 2000 + step as u64).map(Some),
        };
        match result {
            // Returned nodes must match what a reader sees under every strategy
            Ok(Some(returned)) => assert_eq!(forest.reader().get(returned.id).unwrap(), returned, "step {step}"),
            Ok(None) => {}
            Err(err) if err.is_structural() => rejected += 1,
            Err(err) => panic!("step {step}: unexpected error {err}"),
        }

        if let Err(err) = validate_forest(&*forest.store().read(), forest.config()) {
            panic!("step {step}: forest invalidated: {err}");
        }
    }
    debug!("seed {seed}: {steps} random edits, {rejected} rejected");
    assert!(rejected < steps);
}

#[test]
fn test_random_mutations_memory() {
    try_init_logger("info").unwrap();
    let config = TreeConfig::default().with_multi_root(true);
    for seed in 0..4 {
        mutate_randomly(Forest::new(MemoryNodeStore::new(), config), seed, 300);
    }
}

#[test]
fn test_random_mutations_derived_fields() {
    try_init_logger("info").unwrap();
    let config = TreeConfig::default().with_multi_root(true).derived();
    mutate_randomly(Forest::new(MemoryNodeStore::new(), config), 42, 300);
}

#[test]
fn test_random_mutations_mixed_strategies() {
    try_init_logger("info").unwrap();
    let base = TreeConfig::default().with_multi_root(true);
    mutate_randomly(Forest::new(MemoryNodeStore::new(), base.with_level(LevelStrategy::Derived)), 11, 300);
    mutate_randomly(Forest::new(MemoryNodeStore::new(), base.with_parent(ParentStrategy::Derived)), 13, 300);
}

#[test]
fn test_random_mutations_rocksdb() {
    try_init_logger("info").unwrap();
    let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
    let config = TreeConfig::default().with_multi_root(true);
    mutate_randomly(Forest::new(DbNodeStore::new(db, CachePolicy::Count(128)), config), 7, 120);
}
