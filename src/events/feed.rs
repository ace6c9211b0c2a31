use crate::events::codec::{FeedCodec, FeedFrame};
use crate::events::{EventSource, VisEvent};
use crate::utils::metrics::{self, METRICS};
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{info, warn};

/// Reads feed documents from any byte stream (relay socket, dump file, stdin).
pub struct ExternalFeed<R> {
    frames: FramedRead<R, FeedCodec>,
    label: &'static str,
}

impl<R: AsyncRead + Unpin + Send> ExternalFeed<R> {
    pub fn new(reader: R, max_frame_len: usize, label: &'static str) -> Self {
        Self { frames: FramedRead::new(reader, FeedCodec::new(max_frame_len)), label }
    }
}

impl ExternalFeed<TcpStream> {
    pub async fn connect(addr: &str, max_frame_len: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        info!("connected to feed at {}", addr);
        Ok(Self::new(stream, max_frame_len, "feed-tcp"))
    }
}

impl ExternalFeed<tokio::fs::File> {
    pub async fn open<P: AsRef<Path>>(path: P, max_frame_len: usize) -> Result<Self> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        info!("reading feed from {}", path.as_ref().display());
        Ok(Self::new(file, max_frame_len, "feed-file"))
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> EventSource for ExternalFeed<R> {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn next_batch(&mut self) -> Option<Vec<VisEvent>> {
        loop {
            match self.frames.next().await? {
                Ok(FeedFrame::Message(msg)) => {
                    let events = msg.into_events();
                    if !events.is_empty() {
                        return Some(events);
                    }
                }
                Ok(FeedFrame::Malformed(reason)) => {
                    METRICS.inc_counter(metrics::FEED_FRAMES_DROPPED);
                    warn!(source = self.label, %reason, "dropping feed frame");
                }
                Err(e) => {
                    warn!(source = self.label, "feed read failed: {}", e);
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::types::ChainRef;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_reads_split_and_malformed_frames() {
        let reader = Builder::new()
            .read(b"{\"ProposerBlock\":{\"id\":\"p1\",\"par")
            .read(b"ent\":\"p0\",\"transaction_refs\":[],\"proposer_refs\":[]}}\n")
            .read(b"}}garbage\n")
            .read(b"{\"TransactionBlock\":{\"id\":\"t1\",\"parent\":\"p0\",\"miner\":2}}\n")
            .build();
        let mut feed = ExternalFeed::new(reader, 4096, "test");

        let first = feed.next_batch().await.unwrap();
        assert!(matches!(&first[0], VisEvent::AddBlock { chain: ChainRef::Proposer, id, .. } if id == "p1"));

        let before = METRICS.counter(metrics::FEED_FRAMES_DROPPED);
        let second = feed.next_batch().await.unwrap();
        assert_eq!(second, vec![VisEvent::AddTransactionBlock { id: "t1".into(), origin: Some(2) }]);
        assert!(METRICS.counter(metrics::FEED_FRAMES_DROPPED) > before);

        assert!(feed.next_batch().await.is_none());
    }
}
