//! Newsletter email content and rendering.

use std::fs;
use std::path::Path;

use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Per-issue content, edited before each send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterContent {
    /// What happened in the previous episode
    pub last_episode_summary: String,

    /// Teaser for this issue's topic
    pub current_topic_teaser: String,

    /// Title of the linked article
    pub article_title: String,

    /// Featured image for the article
    pub article_image_url: String,

    /// Where the article can be read
    pub article_url: String,
}

impl NewsletterContent {
    /// Load content from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        toml::from_str(&source).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// A previous issue linked from the footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PastPost {
    /// Display title
    pub title: String,
    /// Article URL
    pub url: String,
}

/// Load the past-posts list from a JSON file.
///
/// A missing or malformed file is not fatal: it is logged and the email is
/// rendered without the list.
pub fn load_past_posts(path: &Path) -> Vec<PastPost> {
    let parsed = fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|data| serde_json::from_str(&data).map_err(|e| e.to_string()));

    match parsed {
        Ok(posts) => posts,
        Err(e) => {
            tracing::warn!(
                "Failed to load past posts from {}, using empty list: {}",
                path.display(),
                e
            );
            Vec::new()
        }
    }
}

/// Renders the newsletter HTML with minijinja.
pub struct NewsletterRenderer {
    env: Environment<'static>,
    site_url: String,
}

impl NewsletterRenderer {
    /// Create a renderer linking back to `site_url`.
    pub fn new(site_url: impl Into<String>) -> Self {
        let mut env = Environment::new();

        env.add_template_owned("newsletter.html".to_string(), NEWSLETTER_TEMPLATE.to_string())
            .expect("Failed to add newsletter template");

        Self {
            env,
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Render one recipient's copy.
    pub fn render(
        &self,
        content: &NewsletterContent,
        past_posts: &[PastPost],
        unsubscribe_url: &str,
    ) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template("newsletter.html")?;

        tmpl.render(context! {
            site_url => &self.site_url,
            last_episode_summary => &content.last_episode_summary,
            current_topic_teaser => &content.current_topic_teaser,
            article_title => &content.article_title,
            article_image_url => &content.article_image_url,
            article_url => &content.article_url,
            past_posts => past_posts,
            unsubscribe_url => unsubscribe_url,
        })
    }
}

const NEWSLETTER_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="bn">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>মন্টু মিয়াঁর নতুন অভিযানে স্বাগতম</title>
</head>
<body style="background-color:#f9fafb;font-family:ui-sans-serif,system-ui,-apple-system,'Segoe UI',Roboto,'Noto Sans',sans-serif;">
  <div style="background-color:#ffffff;margin:0 auto;padding:20px 0;max-width:600px;">
    <div style="padding:20px 20px 0;text-align:center;">
      <img src="{{ site_url }}/og.png" width="600" alt="মন্টু মিয়াঁর সিস্টেম ডিজাইন" style="margin:0 auto;border-radius:8px;max-width:100%;">
    </div>
    <div style="padding:20px 40px;color:#4b5563;font-size:16px;line-height:1.6;text-align:center;">
      <h1 style="color:#1f2937;font-size:28px;font-weight:700;margin:30px 0 20px;line-height:1.8;">মন্টু মিয়াঁর নতুন অভিযানে স্বাগতম</h1>
      <p>গত পর্বে আমরা দেখেছিলাম <strong>{{ last_episode_summary }}</strong></p>
      <p>চলুন এবার দেখে আসি <strong>{{ current_topic_teaser }}</strong></p>
      <div style="margin:24px 0;">
        <img src="{{ article_image_url }}" width="560" alt="Article preview" style="margin:0 auto;border-radius:8px;border:1px solid #e5e7eb;max-width:100%;">
      </div>
      <p>আর্টিকেল টি লিঙ্কডইন থেকে পড়ুন এখনই: <a href="{{ article_url }}" style="color:#f59e0b;text-decoration:none;font-weight:500;">{{ article_title }}</a></p>
      <hr style="border-color:#e5e7eb;margin:30px 0;">
      <h2 style="color:#1f2937;font-size:22px;font-weight:600;margin:20px 0 15px;line-height:1.8;">পূর্বের অভিযানগুলো দেখুন লিঙ্কডইন থেকে</h2>
      {% if past_posts %}
      <div style="margin:20px 0;text-align:left;">
        {% for post in past_posts %}
        <p style="margin:8px 0;padding-left:20px;line-height:1.8;">• <a href="{{ post.url }}" style="color:#f59e0b;text-decoration:none;font-weight:500;">{{ post.title }}</a></p>
        {% endfor %}
      </div>
      {% else %}
      <p>আরও অভিযান নেই</p>
      {% endif %}
      <p>মন্টু মিয়ার সব অভিযানগুলো একসাথে পড়ুন এখান থেকে: <a href="{{ site_url }}" style="color:#f59e0b;text-decoration:none;font-weight:500;">{{ site_url }}</a></p>
      <div style="margin-top:40px;padding-top:20px;border-top:1px solid #e5e7eb;font-size:12px;color:#9ca3af;">
        <p>© ২০২৬ মন্টু মিয়াঁর সিস্টেম ডিজাইন</p>
        <p>এই ইমেইলটি আপনি পাচ্ছেন কারণ আপনি আমাদের নিউজলেটারে সাবস্ক্রাইব করেছেন।</p>
        <p><a href="{{ unsubscribe_url }}" style="color:#9ca3af;text-decoration:underline;">Unsubscribe from this list</a></p>
      </div>
    </div>
  </div>
</body>
</html>"##;
