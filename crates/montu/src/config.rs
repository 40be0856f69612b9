//! Site configuration (site.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use montu_newsletter::{SenderConfig, RESEND_API_BASE};
use montu_server::SiteServerConfig;
use serde::Deserialize;

/// Configuration file structure.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub site: SiteSection,
    pub server: ServerSection,
    pub newsletter: NewsletterSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Public URL, used in unsubscribe links
    pub base_url: String,
    /// Built book served by `montu serve`
    pub dist: PathBuf,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            base_url: "https://montumia.com".to_string(),
            dist: PathBuf::from("dist"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NewsletterSection {
    pub from: String,
    pub subject: String,
    pub list_id: String,
    pub unsubscribe_mailto: String,
    /// Per-issue content file
    pub content: PathBuf,
    /// JSON list of previous issues
    pub past_posts: PathBuf,
    /// Email and contact API endpoint
    pub api_base: String,
    /// Pause between emails in a batch
    pub send_delay_ms: u64,
}

impl Default for NewsletterSection {
    fn default() -> Self {
        let sender = SenderConfig::default();
        Self {
            from: sender.from,
            subject: sender.subject,
            list_id: sender.list_id,
            unsubscribe_mailto: sender.unsubscribe_mailto,
            content: PathBuf::from("emails/newsletter.toml"),
            past_posts: PathBuf::from("emails/data/past-posts.json"),
            api_base: RESEND_API_BASE.to_string(),
            send_delay_ms: 1000,
        }
    }
}

impl SiteConfig {
    /// Load configuration from `path` if it exists.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: SiteConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Envelope settings for the bulk sender.
    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            base_url: self.site.base_url.clone(),
            from: self.newsletter.from.clone(),
            subject: self.newsletter.subject.clone(),
            list_id: self.newsletter.list_id.clone(),
            unsubscribe_mailto: self.newsletter.unsubscribe_mailto.clone(),
            delay: Duration::from_millis(self.newsletter.send_delay_ms),
        }
    }

    /// Server settings, with the site section filled in.
    pub fn server_config(&self) -> SiteServerConfig {
        SiteServerConfig {
            site_url: self.site.base_url.clone(),
            dist_dir: Some(self.site.dist.clone()),
            port: self.server.port,
            host: self.server.host.clone(),
            ..Default::default()
        }
    }
}
