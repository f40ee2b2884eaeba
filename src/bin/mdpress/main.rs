use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spdlog::{error, info, warn};

use mdpress::config::open_config;
use mdpress::logger::configure_logger;
use mdpress::metadata_store::MetadataStore;
use mdpress::post_index::PostIndex;
use mdpress::post_processor::PostLoader;
use mdpress::server::server_run;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config_path: Option<String>,
}

#[ntex::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = open_config(args.config_path.map(PathBuf::from))
        .context("Please run mdpress --help")?;

    if let Err(err) = configure_logger(&config) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    info!("Starting mdpress =-=-=-=-=-=-=-=-=-=-=-=-=-=-=-");

    // Held until shutdown so no other process writes the metadata meanwhile
    let store = MetadataStore::open(&config.paths.metadata_file, config.lock_timeout())?;
    let index = Arc::new(PostIndex::new());
    if let Err(err) = PostLoader::new(&store, &index).load(&config.paths.posts_dir) {
        error!("Refusing to serve a partial blog: {}", err);
        return Err(err.into());
    }

    server_run(&config, index).await?;
    drop(store);
    Ok(())
}
