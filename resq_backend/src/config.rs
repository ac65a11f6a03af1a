use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ResqConfig {
    pub api_port: u16,
    pub paths: ResqPaths,
    pub news: NewsConfig,
}

impl ResqConfig {
    pub fn from_env() -> Result<Self> {
        let paths = ResqPaths::discover()?;
        let api_port = env::var("RESQ_API_PORT")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(8080);
        let news = NewsConfig::from_env();
        Ok(Self {
            api_port,
            paths,
            news,
        })
    }

    pub fn new(api_port: u16, paths: ResqPaths) -> Self {
        Self {
            api_port,
            paths,
            news: NewsConfig::from_env(),
        }
    }

    pub fn with_news(api_port: u16, paths: ResqPaths, news: NewsConfig) -> Self {
        Self {
            api_port,
            paths,
            news,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_NEWS_BASE_URL.to_string(),
        }
    }
}

const DEFAULT_NEWS_BASE_URL: &str = "https://gnews.io/api/v4";

impl NewsConfig {
    pub fn from_env() -> Self {
        let api_key = env::var("RESQ_NEWS_API_KEY").ok().and_then(|raw| {
            if raw.trim().is_empty() {
                None
            } else {
                Some(raw)
            }
        });
        let base_url = env::var("RESQ_NEWS_API_BASE")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_NEWS_BASE_URL.to_string());
        Self { api_key, base_url }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ResqPaths {
    pub base: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub contacts_db_path: PathBuf,
    pub logs_dir: PathBuf,
}

impl ResqPaths {
    pub fn discover() -> Result<Self> {
        let exe_path = std::env::current_exe()
            .map_err(|err| anyhow!("failed to resolve current executable: {err}"))?;
        let base = exe_path
            .parent()
            .ok_or_else(|| anyhow!("executable path missing parent"))?
            .to_path_buf();
        Self::from_base_dir(base)
    }

    pub fn from_base_dir<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        let data_dir = base.join("data");
        let db_path = data_dir.join("resq.db");
        let contacts_db_path = data_dir.join("emergency_contacts.db");
        let logs_dir = base.join("logs");

        Ok(Self {
            base,
            data_dir,
            db_path,
            contacts_db_path,
            logs_dir,
        })
    }
}
