//! Fetch the task list once, and print it the way it would be displayed
//!
//! Usage: `nctasks [config.json]`. Without a configuration file, the `BASE_URL`, `USERNAME`, `API_KEY`, `COLLECTION` and `ROOT_DIR`
//! environment variables are used.
//! Set the `RUST_LOG` environment variable to see more about the sync.

use std::path::Path;

use nctasks::cache::Cache;
use nctasks::client::Client;
use nctasks::config::Config;
use nctasks::provider::sync_progress::SyncEvent;
use nctasks::Provider;

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

async fn run() -> nctasks::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(Path::new(&path))?,
        None => Config::from_env(),
    };
    config.validate()?;

    let collection = config.collection_resource()?;
    println!("Syncing {}", collection.url());

    let mut provider = Provider::new(Client::new()?, collection);
    if let Some(path) = config.cache_file() {
        provider = provider.with_cache(Cache::new(path));
    }

    match provider.load_cached() {
        Ok(true) => {
            println!("---- Cached tasks -----");
            nctasks::utils::print_rows(provider.rows());
        },
        Ok(false) => (),
        Err(err) => log::warn!("Invalid cache file: {}. Ignoring it", err),
    }

    let mut status = provider.subscribe_status();
    let result = provider.sync().await;
    while let Ok(event) = status.try_recv() {
        if let SyncEvent::Synced{..} = event {
            println!("{}", event);
        }
    }
    result?;

    println!("---- Tasks -----");
    nctasks::utils::print_rows(provider.rows());
    Ok(())
}
