use crate::events::message::FeedMessage;
use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// One decoded feed document, or the reason it was thrown away.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    Message(FeedMessage),
    Malformed(String),
}

/// Splits a byte stream into concatenated JSON documents.
///
/// Documents may span lines (the node pretty-prints them). A syntax error
/// drops input up to the next newline and decoding resumes there; a partial
/// document larger than `max_frame_len` is dropped the same way.
#[derive(Debug, Clone)]
pub struct FeedCodec {
    max_frame_len: usize,
}

impl FeedCodec {
    pub fn new(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    fn skip_line(src: &mut BytesMut) {
        match src.iter().position(|b| *b == b'\n') {
            Some(pos) => src.advance(pos + 1),
            None => src.clear(),
        }
    }

    fn classify(value: serde_json::Value) -> FeedFrame {
        match serde_json::from_value::<FeedMessage>(value) {
            Ok(msg) => FeedFrame::Message(msg),
            Err(e) => FeedFrame::Malformed(format!("unrecognized message: {}", e)),
        }
    }
}

impl Default for FeedCodec {
    fn default() -> Self {
        Self::new(1 << 20)
    }
}

impl Decoder for FeedCodec {
    type Item = FeedFrame;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(start) => src.advance(start),
            None => {
                src.clear();
                return Ok(None);
            }
        }

        let (next, consumed) = {
            let mut stream = serde_json::Deserializer::from_slice(&src[..]).into_iter::<serde_json::Value>();
            let next = stream.next();
            (next, stream.byte_offset())
        };

        match next {
            Some(Ok(value)) => {
                src.advance(consumed);
                Ok(Some(Self::classify(value)))
            }
            Some(Err(e)) if e.is_eof() => {
                if src.len() > self.max_frame_len {
                    Self::skip_line(src);
                    return Ok(Some(FeedFrame::Malformed(format!(
                        "frame exceeds {} bytes",
                        self.max_frame_len
                    ))));
                }
                Ok(None)
            }
            Some(Err(e)) => {
                Self::skip_line(src);
                Ok(Some(FeedFrame::Malformed(e.to_string())))
            }
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        src.clear();
        Ok(Some(FeedFrame::Malformed("truncated document at end of stream".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &str) -> Vec<FeedFrame> {
        let mut codec = FeedCodec::new(4096);
        let mut buf = BytesMut::from(input);
        let mut out = vec![];
        while let Some(frame) = codec.decode_eof(&mut buf).unwrap() {
            out.push(frame);
        }
        out
    }

    #[test]
    fn test_pretty_printed_documents() {
        let input = "{\n  \"TransactionBlock\": {\n    \"id\": \"t1\",\n    \"parent\": \"p0\"\n  }\n}\n{\"TransactionBlock\":{\"id\":\"t2\",\"parent\":\"p0\"}}\n";
        let frames = decode_all(input);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| matches!(f, FeedFrame::Message(_))));
    }

    #[test]
    fn test_partial_document_waits() {
        let mut codec = FeedCodec::new(4096);
        let mut buf = BytesMut::from(&b"{\"TransactionBlock\":{\"id\":"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\"t1\",\"parent\":\"p\"}}");
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(FeedFrame::Message(_))));
    }

    #[test]
    fn test_garbage_line_resyncs() {
        let input = "not json at all\n{\"UpdatedLedger\":{\"added\":[\"p1\"],\"removed\":[]}}\n";
        let frames = decode_all(input);
        assert!(matches!(frames[0], FeedFrame::Malformed(_)));
        assert!(matches!(frames.last(), Some(FeedFrame::Message(FeedMessage::UpdatedLedger(_)))));
    }

    #[test]
    fn test_unknown_tag_and_oversize() {
        let frames = decode_all("{\"Mystery\":{}}\n");
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], FeedFrame::Malformed(_)));

        let mut codec = FeedCodec::new(8);
        let mut buf = BytesMut::from(&b"{\"TransactionBlock\":{\"id\":\"t1\""[..]);
        assert!(matches!(codec.decode(&mut buf).unwrap(), Some(FeedFrame::Malformed(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_truncated_tail_reported_once() {
        let frames = decode_all("{\"TransactionBlock\":{\"id\":\"t1\",\"parent\":\"p\"}}\n{\"Voter");
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[1], FeedFrame::Malformed(_)));
    }
}
