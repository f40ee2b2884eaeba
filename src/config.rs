use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;

use crate::metadata_store::DEFAULT_LOCK_TIMEOUT;
use crate::post::SiteInfo;

#[derive(Deserialize)]
pub struct Paths {
    pub posts_dir: PathBuf,
    pub metadata_file: PathBuf,
}

#[derive(Deserialize, Default)]
pub struct Store {
    pub lock_timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
pub struct Site {
    pub base_url: String,
    pub author: String,
}

#[derive(Deserialize)]
pub struct Server {
    pub address: String,
    pub port: u16,
}

#[derive(Deserialize)]
pub struct Log {
    pub level: LogLevel,
    pub log_to_console: bool,
    pub location: Option<PathBuf>,
}

#[derive(Deserialize, Copy, Clone, Debug, PartialEq)]
pub enum LogLevel {
    Critical = 0,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize)]
pub struct Config {
    pub paths: Paths,
    #[serde(default)]
    pub store: Store,
    pub site: Site,
    pub server: Server,
    pub log: Option<Log>,
}

impl Config {
    pub fn lock_timeout(&self) -> Duration {
        self.store.lock_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_LOCK_TIMEOUT)
    }

    pub fn site_info(&self) -> SiteInfo {
        SiteInfo {
            base_url: self.site.base_url.clone(),
            author: self.site.author.clone(),
        }
    }
}

fn parse_path(path: PathBuf) -> io::Result<PathBuf> {
    if !path.starts_with("${exe_dir}") {
        return Ok(path);
    }

    let cur_exe = env::current_exe()?;
    let exe_dir = cur_exe.parent().unwrap_or(Path::new("."));
    let rest = path.strip_prefix("${exe_dir}").unwrap_or(&path);
    Ok(exe_dir.join(rest))
}

pub fn parse_config(cfg_content: &str) -> io::Result<Config> {
    let mut cfg: Config = match toml::from_str::<Config>(cfg_content) {
        Ok(cfg) => cfg,
        Err(e) => return Err(io::Error::new(
            ErrorKind::InvalidData, format!("Error parsing configuration file: {}", e))),
    };

    cfg.paths = Paths {
        posts_dir: parse_path(cfg.paths.posts_dir)?,
        metadata_file: parse_path(cfg.paths.metadata_file)?,
    };

    Ok(cfg)
}

pub fn read_config(cfg_path: &Path) -> io::Result<Config> {
    let cfg_content = match fs::read_to_string(cfg_path) {
        Ok(content) => content,
        Err(e) => return Err(io::Error::new(e.kind(), format!("Error opening configuration file {}: {}", cfg_path.display(), e))),
    };

    parse_config(&cfg_content)
}

pub const CFG_FILE_NAME: &str = "mdpress.toml";

fn find_config_path() -> Option<PathBuf> {
    let exe_dir = env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cur_dir = env::current_dir().ok();
    let cfg_dir = dirs::config_dir();

    [exe_dir, cur_dir, cfg_dir]
        .into_iter()
        .flatten()
        .map(|dir| dir.join(CFG_FILE_NAME))
        .find(|path| path.exists())
}

/// Reads `cfg_path`, or the first `mdpress.toml` found next to the
/// executable, in the current directory or in the user config directory.
/// A `[log]` section without location logs to the user cache directory.
pub fn open_config(cfg_path: Option<PathBuf>) -> io::Result<Config> {
    let config_path = match cfg_path.or_else(find_config_path) {
        Some(path) => path,
        None => return Err(io::Error::new(ErrorKind::NotFound, format!("Could not find {}", CFG_FILE_NAME))),
    };

    let mut config = read_config(&config_path)?;

    if let Some(ref mut log) = config.log {
        if log.location.is_none() {
            log.location = dirs::cache_dir().map(|dir| dir.join("mdpress").join("log").join("server.log"));
        }
    }

    Ok(config)
}
