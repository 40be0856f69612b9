//! Print an unsubscribe link.

use anyhow::{Context, Result};
use montu_newsletter::{HashAuthority, NewsletterSecrets};

use crate::config::SiteConfig;

/// Run the link command.
pub fn run(config: &SiteConfig, email: &str) -> Result<()> {
    let secrets = NewsletterSecrets::from_env();
    let hash = HashAuthority::new(secrets.unsubscribe_secret);

    let url = hash
        .unsubscribe_url(&config.site.base_url, email)
        .context("Cannot build unsubscribe link")?;

    println!("{}", url);
    Ok(())
}
