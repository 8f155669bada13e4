// ── Stdout bus publisher ──
//
// Writes each publish as one JSON line: {"topic","retain","payload"}.
// A bus client on the other end of the pipe forwards them.

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

use hearth_core::{PublishError, Publisher};

#[derive(Serialize)]
struct Line<'a> {
    topic: &'a str,
    retain: bool,
    payload: &'a str,
}

/// Line-oriented publisher over any async writer.
pub struct LinePublisher<W> {
    out: Mutex<W>,
}

impl LinePublisher<Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> LinePublisher<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> Publisher for LinePublisher<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, topic: &str, payload: String, retain: bool) -> Result<(), PublishError> {
        let mut line = serde_json::to_vec(&Line {
            topic,
            retain,
            payload: &payload,
        })
        .map_err(|e| PublishError::Encode {
            topic: topic.to_owned(),
            message: e.to_string(),
        })?;
        line.push(b'\n');

        let transport = |e: std::io::Error| PublishError::Transport {
            topic: topic.to_owned(),
            message: e.to_string(),
        };

        // Whole lines only; concurrent cycles must not interleave.
        let mut out = self.out.lock().await;
        out.write_all(&line).await.map_err(transport)?;
        out.flush().await.map_err(transport)
    }
}
