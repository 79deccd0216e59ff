//! Collaborator traits — the seams where external systems plug in.
//!
//! Content generation (LLM prompting), transmission pacing, and feed
//! scraping all live behind these traits; the coordinator only cares
//! about claim/settle bookkeeping around the calls.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ContentItem, GenerateRequest, PushDraft};

/// Produces the text of an unsolicited message for one candidate.
///
/// `Ok(None)`, an empty `text`, or `send == false` all mean the same
/// thing to a driver: settle the claim as failed without consuming the
/// user's daily quota.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, req: GenerateRequest) -> Result<Option<PushDraft>>;
}

/// Fire-and-forget transmission to a user. Typing-delay simulation and
/// bubble splitting live inside implementations, not in the drivers.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, user_id: &str, text: &str) -> Result<()>;
}

/// Pool of shareable items for the share-type categories.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, limit: usize) -> Result<Vec<ContentItem>>;
}
