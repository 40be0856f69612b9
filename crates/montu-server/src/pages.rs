//! HTML pages for the unsubscribe flow.

use minijinja::{context, Environment};

/// Visual tone of a message page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Neutral heading
    Info,
    /// Red heading
    Error,
}

/// A page with a heading and a few paragraphs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MessagePage {
    /// `<title>` text
    pub title: String,
    /// Main heading
    pub heading: String,
    /// Body paragraphs
    pub paragraphs: Vec<String>,
    /// Heading colour
    pub tone: Tone,
}

impl MessagePage {
    /// The unsubscribe link is missing parts or does not verify.
    pub fn invalid_link() -> Self {
        Self {
            title: "Invalid Link".to_string(),
            heading: "ভুল লিংক".to_string(),
            paragraphs: vec!["আনসাবস্ক্রাইব লিংক টি সঠিক নয়।".to_string()],
            tone: Tone::Error,
        }
    }

    /// The server cannot complete the request.
    pub fn server_error() -> Self {
        Self {
            title: "Error".to_string(),
            heading: "সার্ভার এরর".to_string(),
            paragraphs: vec!["কিছু একটা সমস্যা হয়েছে। একটু পরে আবার চেষ্টা করুন।".to_string()],
            tone: Tone::Error,
        }
    }

    /// The contact has been removed.
    pub fn unsubscribed() -> Self {
        Self {
            title: "Unsubscribed".to_string(),
            heading: "আনসাবস্ক্রাইব সফল হয়েছে".to_string(),
            paragraphs: vec![
                "আপনাকে মন্টু মিয়াঁর সিস্টেম ডিজাইন নিউজলেটার থেকে আনসাবস্ক্রাইব করা হয়েছে।"
                    .to_string(),
                "আপনি আর কোন ইমেইল পাবেন না।".to_string(),
            ],
            tone: Tone::Info,
        }
    }
}

/// Renders the unsubscribe pages with minijinja.
pub struct PageRenderer {
    env: Environment<'static>,
    site_url: String,
}

impl PageRenderer {
    /// Create a renderer whose "home" links point at `site_url`.
    pub fn new(site_url: impl Into<String>) -> Self {
        let mut env = Environment::new();

        env.add_template_owned("base.html".to_string(), BASE_TEMPLATE.to_string())
            .expect("Failed to add base template");

        env.add_template_owned("message.html".to_string(), MESSAGE_TEMPLATE.to_string())
            .expect("Failed to add message template");

        env.add_template_owned("confirm.html".to_string(), CONFIRM_TEMPLATE.to_string())
            .expect("Failed to add confirm template");

        Self {
            env,
            site_url: site_url.into(),
        }
    }

    /// Render a [`MessagePage`].
    pub fn message(&self, page: &MessagePage) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template("message.html")?;

        tmpl.render(context! {
            site_url => &self.site_url,
            title => &page.title,
            heading => &page.heading,
            paragraphs => &page.paragraphs,
            tone => page.tone,
        })
    }

    /// Render the "are you sure?" page that posts back to the unsubscribe endpoint.
    pub fn confirm(&self, email: &str, hash: &str) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template("confirm.html")?;

        tmpl.render(context! {
            site_url => &self.site_url,
            title => "আনসাবস্ক্রাইব",
            email => email,
            hash => hash,
            action => montu_newsletter::UNSUBSCRIBE_PATH,
        })
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="bn">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{{ title }}</title>
  <style>
    body { font-family: ui-sans-serif, system-ui, sans-serif; max-width: 600px; margin: 100px auto; padding: 20px; text-align: center; }
    h1 { color: #1f2937; }
    h1.error { color: #dc2626; }
    p { color: #4b5563; line-height: 1.6; }
    a { color: #f59e0b; text-decoration: none; }
    button { background: #f59e0b; color: white; border: none; padding: 12px 24px; font-size: 16px; border-radius: 6px; cursor: pointer; font-weight: 600; }
    button:hover { background: #d97706; }
    .cancel { display: inline-block; margin-left: 10px; color: #6b7280; }
  </style>
</head>
<body>
  {% block content %}{% endblock %}
</body>
</html>"##;

const MESSAGE_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<h1{% if tone == "error" %} class="error"{% endif %}>{{ heading }}</h1>
{% for paragraph in paragraphs %}
<p>{{ paragraph }}</p>
{% endfor %}
<p><a href="{{ site_url }}">মূল পাতায় ফিরে যান</a></p>
{% endblock %}"##;

const CONFIRM_TEMPLATE: &str = r##"{% extends "base.html" %}

{% block content %}
<h1>নিউজলেটার থেকে আনসাবস্ক্রাইব</h1>
<p>আপনি কি নিশ্চিত যে আপনি মন্টু মিয়াঁর সিস্টেম ডিজাইন নিউজলেটার থেকে আনসাবস্ক্রাইব করতে চান?</p>
<p><strong>{{ email }}</strong></p>

<form method="POST" action="{{ action }}">
  <input type="hidden" name="email" value="{{ email }}">
  <input type="hidden" name="hash" value="{{ hash }}">
  <button type="submit">হ্যাঁ, আনসাবস্ক্রাইব করুন</button>
  <a href="{{ site_url }}" class="cancel">না, থাক</a>
</form>
{% endblock %}"##;
