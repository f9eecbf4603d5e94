//! Live chat feed sources.

use async_trait::async_trait;
use chatrelay_types::FeedAction;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::time::Duration;

use crate::error::FeedError;

/// A stream of feed actions; ends when the live stream does.
pub type FeedStream = BoxStream<'static, Result<FeedAction, FeedError>>;

/// Opens continuous event feeds by live id.
#[async_trait]
pub trait ChatFeed: Send + Sync {
    async fn open(&self, live_id: &str) -> Result<FeedStream, FeedError>;
}

/// Reads newline-delimited JSON feed actions over HTTP from
/// `{base_url}/{live_id}`.
#[derive(Debug, Clone)]
pub struct HttpChatFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpChatFeed {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl HttpChatFeed {
    /// `{base_url}/{live_id}`, with the id as exactly one path segment.
    fn feed_url(&self, live_id: &str) -> Result<reqwest::Url, FeedError> {
        if matches!(live_id, "" | "." | "..") {
            return Err(FeedError::Unavailable(format!("invalid live id: {:?}", live_id)));
        }
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| FeedError::Unavailable(format!("invalid feed url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|()| {
                FeedError::Unavailable(format!("feed url cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(live_id);
        Ok(url)
    }
}

#[async_trait]
impl ChatFeed for HttpChatFeed {
    async fn open(&self, live_id: &str) -> Result<FeedStream, FeedError> {
        let url = self.feed_url(live_id)?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }

        Ok(ndjson_actions(response.bytes_stream()))
    }
}

/// Longest feed line accepted before the stream is treated as broken.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines and decodes each non-empty line.
///
/// The stream ends after the first transport error, or after a line longer
/// than [`MAX_LINE_BYTES`].
pub fn ndjson_actions<S, B, E>(bytes: S) -> FeedStream
where
    S: futures_util::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<FeedError> + Send + 'static,
{
    split_lines(bytes, MAX_LINE_BYTES)
}

fn split_lines<S, B, E>(bytes: S, max_line: usize) -> FeedStream
where
    S: futures_util::Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<FeedError> + Send + 'static,
{
    struct State<S> {
        bytes: std::pin::Pin<Box<S>>,
        buf: Vec<u8>,
        done: bool,
    }

    let init = State {
        bytes: Box::pin(bytes),
        buf: Vec::new(),
        done: false,
    };

    stream::unfold(init, move |mut st| async move {
        loop {
            if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = st.buf.drain(..=pos).collect();
                if let Some(item) = decode_line(&line) {
                    return Some((item, st));
                }
                continue;
            }

            if st.buf.len() > max_line {
                st.done = true;
                st.buf.clear();
                return Some((
                    Err(FeedError::Unavailable(format!(
                        "feed line exceeds {} bytes",
                        max_line
                    ))),
                    st,
                ));
            }

            if st.done {
                let rest = std::mem::take(&mut st.buf);
                return decode_line(&rest).map(|item| (item, st));
            }

            match st.bytes.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    st.done = true;
                    st.buf.clear();
                    return Some((Err(e.into()), st));
                }
                None => st.done = true,
            }
        }
    })
    .boxed()
}

fn decode_line(line: &[u8]) -> Option<Result<FeedAction, FeedError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_slice(line).map_err(FeedError::from))
}
