use async_trait::async_trait;
use std::time::Duration;

use crate::domain::traits::Pacer;

/// Sleeps on the tokio timer between reply lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
