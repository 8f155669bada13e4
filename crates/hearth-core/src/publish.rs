// ── Bus publisher seam ──
//
// The bus transport is external. The core only needs fire-and-forget
// publishes with an optional retain flag.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::PublishError;

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), PublishError>;
}

/// Serialize `payload` as JSON and publish it.
pub async fn publish_json<T: Serialize + ?Sized + Sync>(
    publisher: &dyn Publisher,
    topic: &str,
    payload: &T,
    retain: bool,
) -> Result<(), PublishError> {
    let body = serde_json::to_string(payload).map_err(|e| PublishError::Encode {
        topic: topic.to_owned(),
        message: e.to_string(),
    })?;
    publisher.publish(topic, body, retain).await
}
