//! Console delivery — prints outbound pushes to stdout. The default for
//! local runs and demos.

use async_trait::async_trait;

use pingpal_core::error::Result;
use pingpal_core::traits::Delivery;

#[derive(Debug, Default)]
pub struct ConsoleDelivery;

#[async_trait]
impl Delivery for ConsoleDelivery {
    async fn send(&self, user_id: &str, text: &str) -> Result<()> {
        println!("→ [{user_id}] {text}");
        Ok(())
    }
}
