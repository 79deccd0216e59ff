//! # PingPal Channels
//!
//! Concrete delivery backends and content sources. The drivers only see
//! the `Delivery`, `ContentSource`, and `ContentGenerator` traits; what
//! lives here is the plumbing to real endpoints (or to stdout, for
//! local runs).

pub mod console;
pub mod file_source;
pub mod template;
pub mod webhook;

pub use console::ConsoleDelivery;
pub use file_source::FileSource;
pub use template::TemplateGenerator;
pub use webhook::WebhookDelivery;
