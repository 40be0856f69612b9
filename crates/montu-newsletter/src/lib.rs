//! Newsletter plumbing for the montumia.com system design book.
//!
//! This crate holds the pieces the web server and the CLI share: the keyed
//! unsubscribe tokens, the per-client rate limiter, the contact-list and
//! email-delivery clients, and the newsletter renderer with its bulk sender.

pub mod config;
pub mod contacts;
pub mod error;
pub mod hash;
pub mod mailer;
pub mod newsletter;
pub mod rate_limit;
pub mod resend;
pub mod send;

pub use config::{ApiKey, NewsletterSecrets, UnsubscribeSecret};
pub use contacts::{Contact, ContactList, MemoryContacts, ResendContacts};
pub use error::{ConfigError, ContactError, MailError};
pub use hash::{EmailToken, HashAuthority, TOKEN_LEN, UNSUBSCRIBE_PATH};
pub use mailer::{unsubscribe_headers, Mailer, MemoryMailer, OutgoingEmail, ResendMailer};
pub use newsletter::{load_past_posts, NewsletterContent, NewsletterRenderer, PastPost};
pub use resend::ResendApi;
pub use rate_limit::{
    Clock, ManualClock, RateLimitDecision, RateLimitPolicy, RateLimiter, SweeperHandle,
    SystemClock,
};
pub use send::{BulkSender, SendReport, SenderConfig};

/// Default Resend API endpoint.
pub const RESEND_API_BASE: &str = "https://api.resend.com";
