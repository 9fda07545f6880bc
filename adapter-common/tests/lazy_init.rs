//! Once-only initialization under concurrent first access

use adapter_common::{ConfigurationProvider, LazyProvider};
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 16;

fn write_config(root: &TempDir, contents: &str) {
    let path = ConfigurationProvider::resolve_path(root.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_concurrent_first_access_loads_once() {
    let root = TempDir::new().unwrap();
    write_config(&root, "hub.endpoint=https://hub.example.org\n");

    let dir = root.path().to_path_buf();
    let lazy = Arc::new(LazyProvider::new(move || dir.clone()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let lazy = Arc::clone(&lazy);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                lazy.get().unwrap()
            })
        })
        .collect();

    let providers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(lazy.load_attempts(), 1);
    for provider in &providers {
        assert!(Arc::ptr_eq(provider, &providers[0]));
        assert_eq!(provider.get_property("hub.endpoint"), Some("https://hub.example.org"));
    }
}

#[test]
fn test_concurrent_failures_are_not_cached() {
    let root = TempDir::new().unwrap();
    let dir = root.path().to_path_buf();
    let lazy = Arc::new(LazyProvider::new(move || dir.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let lazy = Arc::clone(&lazy);
            thread::spawn(move || lazy.get().is_err())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert!(lazy.load_attempts() >= 1);
    assert!(lazy.get_if_loaded().is_none());

    write_config(&root, "a=1\n");
    let provider = lazy.get().unwrap();
    assert_eq!(provider.get_property("a"), Some("1"));
}
