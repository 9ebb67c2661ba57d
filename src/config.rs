use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "clubhub", about = "Community portal server for clubs and societies")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub portal: PortalConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API from a browser. Empty means any.
    pub cors_origins: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub cookie_name: String,
    pub session_hours: u64,
    /// Usernames granted the admin role when they register.
    pub admin_usernames: Vec<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PortalConfig {
    pub max_title_len: usize,
    pub max_post_len: usize,
    pub max_comment_len: usize,
    pub page_size: u32,
    pub max_page_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "clubhub_session".to_string(),
            session_hours: 720,
            admin_usernames: Vec::new(),
        }
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            max_title_len: 200,
            max_post_len: 10_000,
            max_comment_len: 1000,
            page_size: 20,
            max_page_size: 100,
        }
    }
}

impl PortalConfig {
    /// Rejects limits that would leave no valid page size or text length.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_page_size == 0 {
            anyhow::bail!("portal.max_page_size must be at least 1");
        }
        if self.page_size == 0 || self.page_size > self.max_page_size {
            anyhow::bail!(
                "portal.page_size must be between 1 and max_page_size ({})",
                self.max_page_size
            );
        }
        if self.max_title_len == 0 || self.max_post_len == 0 || self.max_comment_len == 0 {
            anyhow::bail!("portal length limits must be at least 1");
        }
        Ok(())
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("clubhub.db"));
        }

        config.portal.validate()?;
        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match &cli.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(".clubhub"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> anyhow::Result<&PathBuf> {
        self.database
            .path
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("database path not resolved"))
    }

    pub fn is_admin_username(&self, username: &str) -> bool {
        self.auth.admin_usernames.iter().any(|u| u == username)
    }
}
