//! Bulk newsletter sending.
//!
//! Every recipient gets their own unsubscribe link, both in the body and in
//! the `List-Unsubscribe` headers. Failures are counted and logged; they never
//! abort the rest of the batch.

use std::time::Duration;

use crate::error::{ConfigError, MailError};
use crate::hash::HashAuthority;
use crate::mailer::{unsubscribe_headers, Mailer, OutgoingEmail};
use crate::newsletter::{NewsletterContent, NewsletterRenderer, PastPost};

/// Envelope settings for a newsletter issue.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Public site URL, used for unsubscribe links
    pub base_url: String,
    /// `From` header
    pub from: String,
    /// Subject line
    pub subject: String,
    /// `List-Id` header
    pub list_id: String,
    /// Mailbox for mailto unsubscribe requests
    pub unsubscribe_mailto: String,
    /// Pause between consecutive sends
    pub delay: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://montumia.com".to_string(),
            from: "Montu Mia's Newsletter <newsletter@montumia.com>".to_string(),
            subject: "মন্টু মিয়াঁর সিস্টেম ডিজাইন - নিউজলেটার".to_string(),
            list_id: "Montu Mia System Design Newsletter <newsletter.montumia.com>".to_string(),
            unsubscribe_mailto: "unsubscribe@montumia.com".to_string(),
            delay: Duration::from_millis(1000),
        }
    }
}

/// Outcome of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendReport {
    /// Messages accepted by the mailer
    pub sent: usize,
    /// Recipients that failed
    pub failed: usize,
}

/// Renders and sends one issue to many recipients.
pub struct BulkSender<'a, M: Mailer + ?Sized> {
    mailer: &'a M,
    hash: &'a HashAuthority,
    renderer: NewsletterRenderer,
    config: SenderConfig,
}

impl<'a, M: Mailer + ?Sized> BulkSender<'a, M> {
    /// Create a sender.
    ///
    /// Fails when the unsubscribe secret is missing, so no issue ever goes out
    /// with links that cannot be verified.
    pub fn new(
        mailer: &'a M,
        hash: &'a HashAuthority,
        config: SenderConfig,
    ) -> Result<Self, ConfigError> {
        hash.ensure_configured()?;

        Ok(Self {
            mailer,
            hash,
            renderer: NewsletterRenderer::new(config.base_url.clone()),
            config,
        })
    }

    /// Build the message for `recipient`.
    pub fn compose(
        &self,
        recipient: &str,
        content: &NewsletterContent,
        past_posts: &[PastPost],
    ) -> Result<OutgoingEmail, MailError> {
        let unsubscribe_url = self
            .hash
            .unsubscribe_url(&self.config.base_url, recipient)?
            .to_string();

        let html = self
            .renderer
            .render(content, past_posts, &unsubscribe_url)
            .map_err(|e| MailError::Render(e.to_string()))?;

        Ok(OutgoingEmail {
            from: self.config.from.clone(),
            to: recipient.to_string(),
            subject: self.config.subject.clone(),
            html,
            headers: unsubscribe_headers(
                &unsubscribe_url,
                &self.config.unsubscribe_mailto,
                &self.config.list_id,
            ),
        })
    }

    /// Send `content` to every recipient, pausing between sends.
    pub async fn send_all(
        &self,
        recipients: &[String],
        content: &NewsletterContent,
        past_posts: &[PastPost],
    ) -> SendReport {
        tracing::info!("Sending emails to {} recipient(s)", recipients.len());

        let mut report = SendReport::default();

        for (i, recipient) in recipients.iter().enumerate() {
            if i > 0 && !self.config.delay.is_zero() {
                tokio::time::sleep(self.config.delay).await;
            }

            match self.send_one(recipient, content, past_posts).await {
                Ok(id) => {
                    tracing::info!("Email sent to {} (ID: {})", recipient, id);
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to send to {}: {}", recipient, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Successfully sent: {}, failed: {}",
            report.sent,
            report.failed
        );

        report
    }

    async fn send_one(
        &self,
        recipient: &str,
        content: &NewsletterContent,
        past_posts: &[PastPost],
    ) -> Result<String, MailError> {
        let email = self.compose(recipient, content, past_posts)?;
        self.mailer.send(&email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnsubscribeSecret;
    use crate::mailer::MemoryMailer;
    use pretty_assertions::assert_eq;

    fn content() -> NewsletterContent {
        NewsletterContent {
            last_episode_summary: "a".to_string(),
            current_topic_teaser: "b".to_string(),
            article_title: "c".to_string(),
            article_image_url: "https://x/i.png".to_string(),
            article_url: "https://x/a".to_string(),
        }
    }

    fn config() -> SenderConfig {
        SenderConfig {
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn refuses_to_start_without_secret() {
        let mailer = MemoryMailer::new();
        let hash = HashAuthority::new(None);

        let err = BulkSender::new(&mailer, &hash, config()).err();

        assert_eq!(err, Some(ConfigError::MissingSecret));
    }

    #[test]
    fn composes_per_recipient_links() {
        let mailer = MemoryMailer::new();
        let hash = HashAuthority::new(UnsubscribeSecret::new("s"));
        let sender = BulkSender::new(&mailer, &hash, config()).unwrap();

        let email = sender.compose("a@b.com", &content(), &[]).unwrap();
        let token = hash.generate_token("a@b.com").unwrap();

        assert_eq!(email.to, "a@b.com");
        assert_eq!(email.subject, "মন্টু মিয়াঁর সিস্টেম ডিজাইন - নিউজলেটার");
        assert!(email.html.contains(token.as_str()));
        assert_eq!(
            email.headers["List-Unsubscribe"],
            format!(
                "<https://montumia.com/api/unsubscribe?email=a%40b.com&hash={}>, \
                 <mailto:unsubscribe@montumia.com?subject=Unsubscribe>",
                token
            )
        );
    }

    #[tokio::test]
    async fn counts_successes_and_failures() {
        let mailer = MemoryMailer::rejecting(["bad@b.com"]);
        let hash = HashAuthority::new(UnsubscribeSecret::new("s"));
        let sender = BulkSender::new(&mailer, &hash, config()).unwrap();

        let recipients = vec![
            "a@b.com".to_string(),
            "bad@b.com".to_string(),
            "c@d.com".to_string(),
        ];
        let report = sender.send_all(&recipients, &content(), &[]).await;

        assert_eq!(report, SendReport { sent: 2, failed: 1 });

        let sent: Vec<String> = mailer.sent().into_iter().map(|e| e.to).collect();
        assert_eq!(sent, vec!["a@b.com".to_string(), "c@d.com".to_string()]);
    }
}
