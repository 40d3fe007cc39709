use bytes::Bytes;
use futures::{Stream, StreamExt};
use log::{error, info, warn};

use crate::error::ApiError;
use crate::format::ParagraphBuffer;
use crate::model::FragmentStream;

/// Replaces a reply that broke off mid-stream in the stored session.
pub const STREAM_APOLOGY: &str =
    "Ocorreu um erro ao receber a resposta completa. Por favor, tente novamente.";

/// Called once with the text to keep for the turn.
pub type ReplySink = Box<dyn FnOnce(&str) + Send>;

/// Holds the sink until the reply is settled. A body dropped before that
/// (client gone, response discarded) still leaves the apology behind.
struct PendingReply(Option<ReplySink>);

impl PendingReply {
    fn settle(&mut self, text: &str) {
        if let Some(record) = self.0.take() {
            record(text);
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if self.0.is_some() {
            warn!("Reply stream dropped before it finished");
            self.settle(STREAM_APOLOGY);
        }
    }
}

/// Turns raw model fragments into the response body. Text is released a
/// paragraph at a time, formatted, in arrival order. A failing fragment
/// ends the body with an error after the sink has been handed the
/// apology.
pub fn formatted_reply(
    mut fragments: FragmentStream,
    sink: Option<ReplySink>,
) -> impl Stream<Item = Result<Bytes, ApiError>> {
    let mut pending = PendingReply(sink);
    async_stream::stream! {
        let mut buffer = ParagraphBuffer::new();
        let mut reply = String::new();

        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(text) => {
                    if let Some(block) = buffer.push(&text) {
                        reply.push_str(&block);
                        yield Ok(Bytes::from(block));
                    }
                }
                Err(e) => {
                    error!("Reply stream failed after {} chars: {}", reply.len(), e);
                    pending.settle(STREAM_APOLOGY);
                    yield Err(ApiError::Upstream(e.to_string()));
                    return;
                }
            }
        }

        if let Some(block) = buffer.finish() {
            reply.push_str(&block);
            yield Ok(Bytes::from(block));
        }

        info!("Reply stream finished ({} chars)", reply.len());
        pending.settle(&reply);
    }
}
