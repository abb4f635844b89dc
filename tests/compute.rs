use std::sync::Arc;

use exchequer::persist::Persistor;
use exchequer::registry::{Registry, Tier};
use exchequer::stack::{DeclaredDirectory, Directory, Stack, StackKey};
use exchequer::worth::Worth;

fn registry(path: &str) -> (Arc<DeclaredDirectory>, Registry) {
    // Ensure clean start
    let _ = std::fs::remove_dir_all(path);
    let directory = Arc::new(DeclaredDirectory::new());
    directory.declare_item("apple");
    directory.declare_item("arrow");
    directory.declare_fluid("water");
    directory.declare_category("ore_iron", &["iron_ore".to_string()]);
    let directory_dyn: Arc<dyn Directory> = Arc::clone(&directory) as Arc<dyn Directory>;
    let registry = Registry::new(Persistor::new(path), directory_dyn);
    (directory, registry)
}

#[test]
fn override_tier_wins_over_stale_pre_input() {
    let path = "test_exchequer_override";
    let (directory, registry) = registry(path);
    let key = StackKey::wrap(directory.as_ref(), &Stack::item("apple")).expect("wrappable");

    registry
        .register(&Stack::item("apple"), Worth::new(1).expect("worth"), Tier::Pre, false)
        .expect("registered");
    registry.compute().expect("computed");
    assert_eq!(registry.snapshot().worth(&key), Some(Worth::new(1).expect("worth")));

    registry
        .register(&Stack::item("apple"), Worth::new(5).expect("worth"), Tier::Post, false)
        .expect("registered");
    assert_eq!(registry.snapshot().worth(&key), Some(Worth::new(5).expect("worth")));

    registry.compute().expect("computed");
    assert_eq!(
        registry.snapshot().worth(&key),
        Some(Worth::new(5).expect("worth")),
        "the override must win over the stale pre-assigned worth"
    );
    let _ = std::fs::remove_dir_all(path);
}

#[test]
fn compute_is_idempotent() {
    let path = "test_exchequer_idempotent";
    let (_directory, registry) = registry(path);
    registry
        .register(&Stack::item("apple").with_quantity(3), Worth::new(7).expect("worth"), Tier::Pre, false)
        .expect("registered");
    registry
        .register(&Stack::fluid("water"), Worth::new(2).expect("worth"), Tier::Post, false)
        .expect("registered");

    registry.compute().expect("computed");
    let first = registry.snapshot();
    let first_record =
        std::fs::read_to_string(format!("{}/worths.json", path)).expect("snapshot record");

    registry.compute().expect("computed");
    let second = registry.snapshot();
    let second_record =
        std::fs::read_to_string(format!("{}/worths.json", path)).expect("snapshot record");

    assert_eq!(*first, *second);
    assert_eq!(first_record, second_record, "unchanged tiers must bake identical records");
    let _ = std::fs::remove_dir_all(path);
}

#[test]
fn snapshot_iterates_in_key_order() {
    let path = "test_exchequer_sorted";
    let (_directory, registry) = registry(path);
    for stack in [
        Stack::category("ore_iron"),
        Stack::fluid("water"),
        Stack::item("arrow"),
        Stack::item("apple"),
    ] {
        registry
            .register(&stack, Worth::new(1).expect("worth"), Tier::Pre, false)
            .expect("registered");
    }
    registry.compute().expect("computed");
    let snapshot = registry.snapshot();
    let keys: Vec<String> = snapshot.iter().map(|(key, _)| key.to_string()).collect();
    assert_eq!(keys, vec!["item(apple)", "item(arrow)", "fluid(water)", "category(ore_iron)"]);
    let _ = std::fs::remove_dir_all(path);
}

#[test]
fn replaced_snapshots_stay_valid_for_their_holders() {
    let path = "test_exchequer_pinned";
    let (_directory, registry) = registry(path);
    registry
        .register(&Stack::item("apple"), Worth::new(1).expect("worth"), Tier::Pre, false)
        .expect("registered");
    registry.compute().expect("computed");
    let pinned = registry.snapshot();

    registry
        .register(&Stack::item("arrow"), Worth::new(2).expect("worth"), Tier::Pre, false)
        .expect("registered");
    registry.compute().expect("computed");

    assert_eq!(pinned.len(), 1, "a pinned snapshot must not change under its reader");
    assert_eq!(registry.snapshot().len(), 2);
    let _ = std::fs::remove_dir_all(path);
}
