//! Newsletter send command.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use montu_newsletter::{
    load_past_posts, BulkSender, ConfigError, ContactList, HashAuthority, Mailer, MemoryMailer,
    NewsletterContent, NewsletterSecrets, PastPost, ResendApi, ResendContacts, ResendMailer,
    SendReport, SenderConfig,
};

use crate::config::SiteConfig;

/// Run the send command.
///
/// With `dry_run`, every message is rendered and recorded but nothing is
/// delivered.
pub async fn run(
    config: &SiteConfig,
    to: Vec<String>,
    audience: bool,
    dry_run: bool,
) -> Result<()> {
    let secrets = NewsletterSecrets::from_env();
    if secrets.api_key.is_none() && (audience || !dry_run) {
        return Err(ConfigError::MissingApiKey.into());
    }

    let hash = HashAuthority::new(secrets.unsubscribe_secret.clone());
    hash.ensure_configured()?;

    let api = ResendApi::with_base_url(&config.newsletter.api_base, secrets.api_key.clone());

    let recipients = if audience {
        let contacts = ResendContacts::new(api.clone(), secrets.audience_id.clone());
        contacts
            .list()
            .await
            .context("Failed to fetch contacts")?
            .into_iter()
            .map(|contact| contact.email)
            .collect()
    } else {
        to
    };

    if recipients.is_empty() {
        bail!("No recipients. Pass --to EMAIL or --audience.");
    }

    let content = NewsletterContent::load(&config.newsletter.content)?;
    let past_posts = load_past_posts(&config.newsletter.past_posts);
    let issue = Issue {
        hash: &hash,
        content: &content,
        past_posts: &past_posts,
    };

    let report = if dry_run {
        let mailer = MemoryMailer::new();
        let mut sender_config = config.sender_config();
        sender_config.delay = Duration::ZERO;

        let report = issue.deliver(&mailer, sender_config, &recipients).await?;
        for email in mailer.sent() {
            tracing::info!(
                "Dry run: would send \"{}\" to {} ({} bytes)",
                email.subject,
                email.to,
                email.html.len()
            );
        }
        report
    } else {
        let mailer = ResendMailer::new(api);
        issue
            .deliver(&mailer, config.sender_config(), &recipients)
            .await?
    };

    if report.failed > 0 {
        bail!(
            "{} of {} email(s) failed",
            report.failed,
            report.sent + report.failed
        );
    }

    Ok(())
}

/// One rendered issue, ready to go to any mailer.
struct Issue<'a> {
    hash: &'a HashAuthority,
    content: &'a NewsletterContent,
    past_posts: &'a [PastPost],
}

impl Issue<'_> {
    async fn deliver<M: Mailer>(
        &self,
        mailer: &M,
        config: SenderConfig,
        recipients: &[String],
    ) -> Result<SendReport> {
        let sender = BulkSender::new(mailer, self.hash, config)?;
        Ok(sender
            .send_all(recipients, self.content, self.past_posts)
            .await)
    }
}
