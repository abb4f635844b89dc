use criterion::{Criterion, criterion_group, criterion_main};

use std::sync::Arc;

use exchequer::persist::Persistor;
use exchequer::registry::{Registry, Tier};
use exchequer::stack::{DeclaredDirectory, Directory, Stack};
use exchequer::worth::Worth;

pub fn criterion_benchmark(c: &mut Criterion) {
    let _ = std::fs::remove_dir_all("bench_worths");
    let directory = Arc::new(DeclaredDirectory::new());
    let directory_dyn: Arc<dyn Directory> = Arc::clone(&directory) as Arc<dyn Directory>;
    let registry = Registry::new(Persistor::new("bench_worths"), directory_dyn);
    let mut registered: u32 = 0;
    for target in [10u32, 1_000, 10_000] {
        while registered < target {
            let id = format!("resource_{:05}", registered);
            directory.declare_item(&id);
            registry
                .register(
                    &Stack::item(&id),
                    Worth::new(registered as f64 + 1.0).unwrap(),
                    Tier::Pre,
                    false,
                )
                .unwrap();
            registered += 1;
        }
        c.bench_function(&format!("compute {}", target), |b| {
            b.iter(|| registry.compute().unwrap())
        });
    }
    let _ = std::fs::remove_dir_all("bench_worths");
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
