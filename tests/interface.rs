use std::sync::Arc;

use exchequer::interface::{ScriptInterface, ScriptOptions};
use exchequer::persist::Persistor;
use exchequer::registry::Registry;
use exchequer::stack::{DeclaredDirectory, Directory};

fn interface(path: &str) -> (Arc<DeclaredDirectory>, Arc<Registry>, ScriptInterface) {
    // Ensure clean start
    let _ = std::fs::remove_dir_all(path);
    let directory = Arc::new(DeclaredDirectory::new());
    let directory_dyn: Arc<dyn Directory> = Arc::clone(&directory) as Arc<dyn Directory>;
    let registry = Arc::new(Registry::new(Persistor::new(path), directory_dyn));
    let interface = ScriptInterface::new(Arc::clone(&registry), Arc::clone(&directory));
    (directory, registry, interface)
}

#[test]
fn background_scripts_stream_their_rows() {
    let (_directory, registry, interface) = interface("test_exchequer_interface");
    let handle = interface.start_script(
        "declare item apple; add post [item(apple), 5]; worth item(apple);".to_string(),
        ScriptOptions::default(),
    );
    let results = handle.results.as_ref().expect("streaming");
    let rows: Vec<String> = results.iter().map(|row| row.0).collect();
    handle.join();
    assert!(rows.contains(&"item(apple) = 5".to_string()));
    assert!(!registry.snapshot().is_empty());
}

#[test]
fn zero_timeout_scripts_never_start() {
    let (directory, _registry, interface) = interface("test_exchequer_interface_cancel");
    let handle = interface.start_script(
        "declare item apple;".to_string(),
        ScriptOptions { stream_results: false, timeout: Some(std::time::Duration::ZERO) },
    );
    handle.join();
    assert!(directory.is_empty(), "the declaration must not have run");
}

#[test]
fn submitted_scripts_are_cancellable_by_id() {
    let (_directory, _registry, interface) = interface("test_exchequer_interface_id");
    let handle = interface.start_script(
        "declare item apple;".to_string(),
        ScriptOptions { stream_results: false, timeout: None },
    );
    assert!(interface.cancel(handle.id), "a submitted script must be known to the interface");
    handle.join();
}
