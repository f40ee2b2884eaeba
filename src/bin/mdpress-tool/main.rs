use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mdpress::config::{open_config, Config};
use mdpress::metadata_store::MetadataStore;
use mdpress::post_index::PostIndex;
use mdpress::post_processor::{LoadSummary, PostLoader};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load all posts once and record new or changed content
    Load,
    /// Load all posts and print them, newest first
    List,
    /// Set the title of a post, or clear it when no title is given
    SetTitle {
        /// Post id, the file name without `.md`
        id: String,
        title: Option<String>,
    },
}

fn load(config: &Config, store: &MetadataStore, index: &PostIndex) -> Result<LoadSummary> {
    PostLoader::new(store, index)
        .load(&config.paths.posts_dir)
        .with_context(|| format!("Error loading posts from {}", config.paths.posts_dir.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = open_config(args.config_path.map(PathBuf::from))
        .context("Please run mdpress-tool --help")?;
    let store = MetadataStore::open(&config.paths.metadata_file, config.lock_timeout())?;

    match args.command {
        Command::Load => {
            let summary = load(&config, &store, &PostIndex::new())?;
            println!("{} posts: {} new, {} updated, {} unchanged",
                     summary.loaded, summary.created, summary.updated, summary.unchanged);
        }
        Command::List => {
            let index = PostIndex::new();
            load(&config, &store, &index)?;
            for post in index.list() {
                println!("{}\t{}\t{}\t{}",
                         post.id,
                         post.metadata.created_at.format("%Y-%m-%d %H:%M:%S"),
                         post.metadata.updated_at.format("%Y-%m-%d %H:%M:%S"),
                         post.title());
            }
        }
        Command::SetTitle { id, title } => {
            let metadata = store.set_override_title(&id, title)?;
            match metadata.override_title {
                Some(title) => println!("Title of {} set to {}", id, title),
                None => println!("Title of {} cleared", id),
            }
        }
    }

    Ok(())
}
