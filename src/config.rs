use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use ini::Ini;
use tracing::debug;

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "curtis.ini";
pub const HOME_CONFIG_FILE_NAME: &str = ".curtis.ini";
pub const MAIN_SECTION: &str = "curtis";
pub const SITE_PREFIX: &str = "site:";
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

pub const DEFAULT_AGE_OF_ISSUES_TO_RESOLVE: i64 = 30;
pub const DEFAULT_AGE_OF_ISSUES_TO_MARK_AS_SEEN: i64 = 7;
/// Upper bound accepted for `--age`, about a century.
pub const MAX_AGE_DAYS: i64 = 36_500;
pub const DEFAULT_TREND_PERIOD: &str = "12h";
pub const DEFAULT_TREND_THRESHOLD: f64 = 1.0;
pub const BROWSE_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub site: String,
    pub url: String,
    pub token: String,
    pub timeout: Duration,
}

/// `./curtis.ini`, then `~/.curtis.ini`.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
    if let Some(dirs) = BaseDirs::new() {
        paths.push(dirs.home_dir().join(HOME_CONFIG_FILE_NAME));
    }
    paths
}

pub fn load_config(config_file: Option<&Path>, site: Option<&str>) -> Result<Config, ConfigError> {
    let candidates = match config_file {
        Some(path) => vec![path.to_path_buf()],
        None => default_config_paths(),
    };

    let path = candidates
        .iter()
        .find(|path| path.is_file())
        .ok_or_else(|| ConfigError::NotFound {
            searched: candidates.iter().map(|p| p.display().to_string()).collect(),
        })?;

    debug!(path = %path.display(), "loading configuration");
    let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Unreadable {
        path: path.clone(),
        source,
    })?;
    from_ini(&ini, site)
}

pub fn sites(ini: &Ini) -> Vec<String> {
    let mut sites: Vec<String> = ini
        .sections()
        .flatten()
        .filter_map(|name| name.strip_prefix(SITE_PREFIX))
        .map(str::to_string)
        .collect();
    sites.sort();
    sites
}

pub fn from_ini(ini: &Ini, site: Option<&str>) -> Result<Config, ConfigError> {
    let available = sites(ini);
    let default_site = ini
        .section(Some(MAIN_SECTION))
        .and_then(|section| section.get("default_site"))
        .filter(|name| !name.is_empty());

    let site = match site.or(default_site) {
        Some(site) => site.to_string(),
        None => available.first().cloned().ok_or(ConfigError::NoSites)?,
    };

    let section = ini
        .section(Some(format!("{}{}", SITE_PREFIX, site)))
        .ok_or_else(|| ConfigError::UnknownSite {
            site: site.clone(),
            available: available.clone(),
        })?;

    let required = |key: &'static str| {
        section
            .get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingKey {
                site: site.clone(),
                key,
            })
    };
    let url = required("url")?;
    let token = required("token")?;

    let timeout = match section.get("timeout").map(str::trim) {
        None | Some("") => Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        Some(raw) => parse_timeout(raw).ok_or_else(|| ConfigError::InvalidTimeout {
            site: site.clone(),
            value: raw.to_string(),
        })?,
    };

    Ok(Config {
        site,
        url,
        token,
        timeout,
    })
}

fn parse_timeout(raw: &str) -> Option<Duration> {
    let secs: f64 = raw.parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}
