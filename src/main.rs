use std::fs;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use config::{Config, Environment, File};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use exchequer::error::{ExchequerError, Result};
use exchequer::persist::Persistor;
use exchequer::registry::Registry;
use exchequer::script::Engine;
use exchequer::stack::{DeclaredDirectory, Directory};

struct Settings {
    data_directory: String,
    startup_script: Option<String>,
}

// settings come from exchequer.toml next to the binary, overridable with
// EXCHEQUER_* environment variables
fn settings() -> Result<Settings> {
    let config = Config::builder()
        .set_default("data_directory", "exchequer_worths")
        .map_err(|e| ExchequerError::Config(e.to_string()))?
        .add_source(File::with_name("exchequer").required(false))
        .add_source(Environment::with_prefix("EXCHEQUER"))
        .build()
        .map_err(|e| ExchequerError::Config(e.to_string()))?;
    let data_directory =
        config.get_string("data_directory").map_err(|e| ExchequerError::Config(e.to_string()))?;
    let startup_script = config.get_string("startup_script").ok();
    Ok(Settings { data_directory, startup_script })
}

fn run() -> Result<()> {
    let settings = settings()?;
    let directory = Arc::new(DeclaredDirectory::new());
    let directory_dyn: Arc<dyn Directory> = Arc::clone(&directory) as Arc<dyn Directory>;
    let registry =
        Registry::new(Persistor::new(&settings.data_directory), directory_dyn);
    registry.load()?;

    let engine = Engine::new(&registry, &directory);
    if let Some(path) = &settings.startup_script {
        info!(script = %path, "running startup script");
        let script = fs::read_to_string(path)
            .map_err(|e| ExchequerError::Config(format!("startup script {}: {}", path, e)))?;
        engine.execute(&script);
    }

    println!("exchequer {} (quit; leaves and saves)", env!("CARGO_PKG_VERSION"));
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line == "quit" || line == "quit;" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        engine.execute(line);
    }

    registry.save()?;
    info!("worth records saved");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    if let Err(error) = run() {
        error!(error = %error, "exchequer terminated");
        std::process::exit(1);
    }
}
