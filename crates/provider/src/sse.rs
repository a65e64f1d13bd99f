//! Server-sent event decoding for streamed completions

use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{stream, Stream, StreamExt};
use serde_json::Value;
use tracing::trace;

use crate::{ProviderError, Result};

/// Stream of answer text chunks
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

const DONE: &str = "[DONE]";

/// Splits a byte stream into `data:` payloads.
///
/// Lines may arrive split across chunks, including in the middle of a
/// multi-byte character, so bytes are buffered until a newline is seen.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every complete `data:` payload
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = Self::data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buffer);
        Self::data_payload(&line).into_iter().collect()
    }

    fn data_payload(line: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        line.strip_prefix("data:")
            .map(|data| data.trim_start().to_string())
    }
}

/// Extract the delta text from one streamed completion payload
pub fn delta_text(payload: &str) -> Result<Option<String>> {
    let json: Value = serde_json::from_str(payload)?;

    if let Some(error) = json.get("error") {
        let message = error["message"]
            .as_str()
            .unwrap_or("stream error")
            .to_string();
        return Err(ProviderError::Api(message));
    }

    Ok(json["choices"]
        .get(0)
        .and_then(|choice| choice["delta"]["content"].as_str())
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string()))
}

struct DecodeState<S> {
    inner: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Turn a raw SSE byte stream into a stream of answer text
pub fn text_stream<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let state = DecodeState {
        inner: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if let Some(payload) = st.pending.pop_front() {
                if payload == DONE {
                    trace!("Stream finished");
                    st.done = true;
                    st.pending.clear();
                    continue;
                }
                match delta_text(&payload) {
                    Ok(Some(text)) => return Some((Ok(text), st)),
                    Ok(None) => continue,
                    Err(e) => {
                        st.done = true;
                        st.pending.clear();
                        return Some((Err(e), st));
                    }
                }
            }

            if st.done {
                return None;
            }

            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    let payloads = st.decoder.push(chunk.as_ref());
                    st.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e.into()), st));
                }
                None => {
                    st.done = true;
                    let payloads = st.decoder.finish();
                    st.pending.extend(payloads);
                }
            }
        }
    }))
}
