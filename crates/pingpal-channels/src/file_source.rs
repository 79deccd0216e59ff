//! JSON-lines content source — one `ContentItem` per line, curated by
//! whatever feed scraper or cron job the operator runs. A missing file
//! is an empty pool, not an error, so the articles driver can start
//! before the first scrape lands.

use async_trait::async_trait;
use std::path::PathBuf;

use pingpal_core::error::Result;
use pingpal_core::traits::ContentSource;
use pingpal_core::types::ContentItem;

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContentSource for FileSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<ContentItem>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;

        let mut items = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ContentItem>(line) {
                Ok(item) => items.push(item),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        "skipping malformed content line: {e}"
                    );
                }
            }
            if items.len() >= limit {
                break;
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_file_is_empty_pool() {
        let source = FileSource::new("/nonexistent/articles.jsonl");
        assert!(source.fetch(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reads_lines_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"source":"feed","title":"One","link":"https://a/1"}}"#).unwrap();
        writeln!(f, "not json").unwrap();
        writeln!(f).unwrap();
        writeln!(f, r#"{{"source":"feed","guid":"g2","title":"Two","link":"https://a/2"}}"#).unwrap();

        let source = FileSource::new(&path);
        let items = source.fetch(10).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "One");
        assert_eq!(items[1].guid.as_deref(), Some("g2"));
    }

    #[tokio::test]
    async fn test_limit_respected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.jsonl");
        let mut f = std::fs::File::create(&path).unwrap();
        for n in 0..5 {
            writeln!(f, r#"{{"source":"feed","title":"t{n}","link":"https://a/{n}"}}"#).unwrap();
        }
        let source = FileSource::new(&path);
        assert_eq!(source.fetch(3).await.unwrap().len(), 3);
    }
}
