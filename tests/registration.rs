use std::sync::Arc;

use exchequer::error::ExchequerError;
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
    let directory_dyn: Arc<dyn Directory> = Arc::clone(&directory) as Arc<dyn Directory>;
    let registry = Registry::new(Persistor::new(path), directory_dyn);
    (directory, registry)
}

#[test]
fn registration_normalizes_to_per_unit_worth() {
    let (directory, registry) = registry("test_exchequer_normalize");
    registry
        .register(&Stack::item("apple").with_quantity(4), Worth::new(8).expect("worth"), Tier::Pre, false)
        .expect("registered");
    let key = StackKey::wrap(directory.as_ref(), &Stack::item("apple")).expect("wrappable");
    let pre = registry.pre_keeper();
    let kept = pre.lock().expect("keeper").get(&key);
    assert_eq!(kept, Some(Worth::new(2).expect("worth")));
}

#[test]
fn fluid_volume_is_factored_like_a_count() {
    let (directory, registry) = registry("test_exchequer_fluid");
    registry
        .register(&Stack::fluid("water").with_quantity(500), Worth::new(1000).expect("worth"), Tier::Pre, false)
        .expect("registered");
    let key = StackKey::wrap(directory.as_ref(), &Stack::fluid("water")).expect("wrappable");
    let pre = registry.pre_keeper();
    assert_eq!(pre.lock().expect("keeper").get(&key), Some(Worth::new(2).expect("worth")));
}

#[test]
fn unknown_identifier_is_reported_and_nothing_is_stored() {
    let (_directory, registry) = registry("test_exchequer_unknown");
    let rejected =
        registry.register(&Stack::item("pear"), Worth::new(3).expect("worth"), Tier::Pre, false);
    assert!(matches!(rejected, Err(ExchequerError::Unwrappable(_))));
    assert!(registry.pre_keeper().lock().expect("keeper").is_empty());
    assert!(registry.post_keeper().lock().expect("keeper").is_empty());
    assert!(registry.snapshot().is_empty());
}

#[test]
fn non_positive_worths_never_construct() {
    for scalar in [0.0, -3.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(Worth::new(scalar), Err(ExchequerError::InvalidWorth(_))), "{}", scalar);
    }
}

#[test]
fn factoring_divides_and_rejects_zero_units() {
    let worth = Worth::new(9).expect("worth");
    assert_eq!(worth.factor(3).expect("factored").get(), 3.0);
    assert!(worth.factor(0).is_err());
}

#[test]
fn post_assignment_is_visible_before_any_compute() {
    let (directory, registry) = registry("test_exchequer_post_visible");
    registry
        .register(&Stack::item("apple"), Worth::new(5).expect("worth"), Tier::Post, false)
        .expect("registered");
    let key = StackKey::wrap(directory.as_ref(), &Stack::item("apple")).expect("wrappable");
    assert_eq!(registry.snapshot().worth(&key), Some(Worth::new(5).expect("worth")));
    let post = registry.post_keeper();
    assert_eq!(post.lock().expect("keeper").get(&key), Some(Worth::new(5).expect("worth")));
}

#[test]
fn post_assignment_publishes_unfactored_but_keeps_per_unit() {
    let (directory, registry) = registry("test_exchequer_post_factored");
    registry
        .register(&Stack::item("apple").with_quantity(5), Worth::new(10).expect("worth"), Tier::Post, false)
        .expect("registered");
    let key = StackKey::wrap(directory.as_ref(), &Stack::item("apple")).expect("wrappable");
    // the snapshot shows the requested worth as-is
    assert_eq!(registry.snapshot().worth(&key), Some(Worth::new(10).expect("worth")));
    // the override tier remembers the per-unit form for future recomputes
    let post = registry.post_keeper();
    assert_eq!(post.lock().expect("keeper").get(&key), Some(Worth::new(2).expect("worth")));
}

#[test]
fn re_registration_replaces_rather_than_accumulates() {
    let (directory, registry) = registry("test_exchequer_replace");
    let key = StackKey::wrap(directory.as_ref(), &Stack::item("arrow")).expect("wrappable");
    registry
        .register(&Stack::item("arrow"), Worth::new(2).expect("worth"), Tier::Pre, false)
        .expect("registered");
    registry
        .register(&Stack::item("arrow"), Worth::new(7).expect("worth"), Tier::Pre, false)
        .expect("registered");
    let pre = registry.pre_keeper();
    let keeper = pre.lock().expect("keeper");
    assert_eq!(keeper.len(), 1);
    assert_eq!(keeper.get(&key), Some(Worth::new(7).expect("worth")));
}
