//! Template generator — canned per-category text, no model call.
//!
//! Stands in wherever a real LLM generator is not wired up yet; the
//! drivers cannot tell the difference, which also makes it the generator
//! of choice for demos and smoke runs.

use async_trait::async_trait;

use pingpal_core::error::Result;
use pingpal_core::traits::ContentGenerator;
use pingpal_core::types::{GenerateRequest, PushCategory, PushDraft};

#[derive(Debug, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    fn render(req: &GenerateRequest) -> String {
        match req.category {
            PushCategory::Nudge => {
                let hours = req.idle_minutes / 60;
                format!("Hey, it's been about {hours}h since we talked. How's your day going?")
            }
            PushCategory::Articles => {
                let title = req.context["item"]["title"].as_str().unwrap_or("something");
                let link = req.context["item"]["link"].as_str().unwrap_or("");
                format!("Found this and thought of you: {title} {link}").trim_end().to_string()
            }
            PushCategory::Weather => {
                let city = req.context["city"].as_str().unwrap_or("your city");
                format!("Morning! Here's today's outlook for {city}.")
            }
            PushCategory::Digest => {
                let week = req.context["week"].as_str().unwrap_or("this week");
                let count = req.context["items"].as_array().map(Vec::len).unwrap_or(0);
                format!("Weekly digest ({week}): {count} picks worth a look.")
            }
            PushCategory::Market => {
                let date = req.context["date"].as_str().unwrap_or("today");
                format!("Market close for {date}: here's the summary.")
            }
        }
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    async fn generate(&self, req: GenerateRequest) -> Result<Option<PushDraft>> {
        Ok(Some(PushDraft { text: Self::render(&req), send: true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_renders_each_category() {
        let generator = TemplateGenerator;
        let req = GenerateRequest {
            category: PushCategory::Nudge,
            user_id: "u1".into(),
            idle_minutes: 540,
            context: serde_json::Value::Null,
        };
        let draft = generator.generate(req).await.unwrap().unwrap();
        assert!(draft.text.contains("9h"));
        assert!(draft.send);

        let req = GenerateRequest {
            category: PushCategory::Articles,
            user_id: "u1".into(),
            idle_minutes: 90,
            context: serde_json::json!({ "item": { "title": "Rust 2.0", "link": "https://x/1" } }),
        };
        let draft = generator.generate(req).await.unwrap().unwrap();
        assert!(draft.text.contains("Rust 2.0"));

        let req = GenerateRequest {
            category: PushCategory::Weather,
            user_id: "u1".into(),
            idle_minutes: 0,
            context: serde_json::json!({ "city": "Hanoi" }),
        };
        let draft = generator.generate(req).await.unwrap().unwrap();
        assert!(draft.text.contains("Hanoi"));
    }
}
