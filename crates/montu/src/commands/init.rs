//! Initialize newsletter files in a project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing montu...");
    write_defaults(config_path, Path::new("emails"), yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Edit emails/newsletter.toml, then run 'montu send --to you@example.com'.");

    Ok(())
}

fn write_defaults(config_path: &Path, emails_dir: &Path, yes: bool) -> Result<()> {
    let data_dir = emails_dir.join("data");
    fs::create_dir_all(&data_dir).context("Failed to create emails/data directory")?;

    write_file(config_path, DEFAULT_CONFIG, yes)?;
    write_file(&emails_dir.join("newsletter.toml"), DEFAULT_CONTENT, yes)?;
    write_file(&data_dir.join("past-posts.json"), DEFAULT_PAST_POSTS, yes)?;

    Ok(())
}

fn write_file(path: &Path, content: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::warn!("{} already exists. Use --yes to overwrite.", path.display());
        return Ok(());
    }

    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Montu Configuration
#
# Secrets are read from the environment, never from this file:
#   UNSUBSCRIBE_SECRET  key for unsubscribe links
#   RESEND_API_KEY      email and contact API key
#   RESEND_SEGMENT_ID   audience holding the subscribers

[site]
# Public URL (used in unsubscribe links)
base_url = "https://montumia.com"

# Built book served by 'montu serve'
dist = "dist"

[server]
host = "127.0.0.1"
port = 3000

[newsletter]
from = "Montu Mia's Newsletter <newsletter@montumia.com>"
subject = "মন্টু মিয়াঁর সিস্টেম ডিজাইন - নিউজলেটার"
list_id = "Montu Mia System Design Newsletter <newsletter.montumia.com>"
unsubscribe_mailto = "unsubscribe@montumia.com"
content = "emails/newsletter.toml"
past_posts = "emails/data/past-posts.json"
api_base = "https://api.resend.com"

# Pause between emails, in milliseconds
send_delay_ms = 1000
"#;

const DEFAULT_CONTENT: &str = r#"# Content for the next newsletter issue

last_episode_summary = "গত পর্বে মন্টু মিয়াঁ তার প্রথম সার্ভার বানিয়েছিল।"
current_topic_teaser = "এবার সার্ভারে ভিড় বাড়ছে। মন্টু মিয়াঁ কি লোড সামলাতে পারবে?"
article_title = "লোড ব্যালান্সার"
article_image_url = "https://montumia.com/images/load-balancer.png"
article_url = "https://montumia.com/load-balancer/"
"#;

const DEFAULT_PAST_POSTS: &str = r#"[
  {
    "title": "মন্টু মিয়াঁর প্রথম সার্ভার",
    "url": "https://montumia.com/first-server/"
  }
]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use montu_newsletter::{load_past_posts, NewsletterContent};
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_matches_built_in_defaults() {
        let parsed: SiteConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        let defaults = SiteConfig::default();

        assert_eq!(parsed.site.base_url, defaults.site.base_url);
        assert_eq!(parsed.server.port, defaults.server.port);
        assert_eq!(parsed.newsletter.subject, defaults.newsletter.subject);
        assert_eq!(parsed.newsletter.list_id, defaults.newsletter.list_id);
        assert_eq!(parsed.newsletter.content, defaults.newsletter.content);
        assert_eq!(parsed.newsletter.api_base, defaults.newsletter.api_base);
    }

    #[test]
    fn writes_loadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("site.toml");
        let emails = dir.path().join("emails");

        write_defaults(&config_path, &emails, false).unwrap();

        assert!(SiteConfig::load(&config_path).is_ok());
        let content = NewsletterContent::load(&emails.join("newsletter.toml")).unwrap();
        assert_eq!(content.article_title, "লোড ব্যালান্সার");
        let posts = load_past_posts(&emails.join("data/past-posts.json"));
        assert_eq!(posts.len(), 1);
    }

    #[test]
    fn keeps_existing_files_without_yes() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("site.toml");
        fs::write(&config_path, "# mine\n").unwrap();

        write_defaults(&config_path, &dir.path().join("emails"), false).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine\n");

        write_defaults(&config_path, &dir.path().join("emails"), true).unwrap();
        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG);
    }
}
