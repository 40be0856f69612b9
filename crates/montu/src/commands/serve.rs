//! Newsletter server command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use montu_newsletter::{HashAuthority, NewsletterSecrets, ResendApi, ResendContacts};
use montu_server::SiteServer;

use crate::config::SiteConfig;

/// Run the serve command.
pub async fn run(
    config: SiteConfig,
    port: Option<u16>,
    host: Option<String>,
    dist: Option<PathBuf>,
) -> Result<()> {
    let secrets = NewsletterSecrets::from_env();
    secrets.report_missing();

    let mut server_config = config.server_config();
    if let Some(port) = port {
        server_config.port = port;
    }
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(dist) = dist {
        server_config.dist_dir = Some(dist);
    }

    if let Some(dir) = server_config.dist_dir.take() {
        if dir.exists() {
            server_config.dist_dir = Some(dir);
        } else {
            tracing::warn!(
                "Directory not found: {}. Serving newsletter endpoints only.",
                dir.display()
            );
        }
    }

    let api = ResendApi::with_base_url(&config.newsletter.api_base, secrets.api_key.clone());
    let contacts = ResendContacts::new(api, secrets.audience_id.clone());
    let hash = HashAuthority::new(secrets.unsubscribe_secret);

    SiteServer::new(server_config, hash, Arc::new(contacts))
        .start()
        .await?;

    Ok(())
}
