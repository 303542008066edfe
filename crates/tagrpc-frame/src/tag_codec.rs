use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Streaming codec for use with `tokio_util::codec::{FramedRead, FramedWrite}`.
///
/// Handles partial reads internally: the decoder yields a frame only once all
/// of its bytes are buffered, whatever the socket's read boundaries were.
#[derive(Debug, Clone, Default)]
pub struct TagCodec {
    config: FrameConfig,
}

impl TagCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    /// Maximum payload size accepted in either direction.
    pub fn max_payload_size(&self) -> usize {
        self.config.max_payload_size
    }

    /// Current codec configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for TagCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.config.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Frame> for TagCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if frame.payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.config.max_payload_size,
            });
        }
        encode_frame(frame.tag, &frame.payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use bytes::{BufMut, Bytes};
    use futures_util::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::codec::HEADER_SIZE;

    #[tokio::test]
    async fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(1, b"hello", &mut wire).unwrap();

        let mut reader = FramedRead::new(&wire[..], TagCodec::new());
        let frame = reader.next().await.unwrap().unwrap();

        assert_eq!(frame.tag, 1);
        assert_eq!(frame.payload.as_ref(), b"hello");
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn read_multiple_frames() {
        let mut wire = BytesMut::new();
        encode_frame(1, b"one", &mut wire).unwrap();
        encode_frame(2, b"two", &mut wire).unwrap();
        encode_frame(3, b"three", &mut wire).unwrap();

        let mut reader = FramedRead::new(&wire[..], TagCodec::new());

        let f1 = reader.next().await.unwrap().unwrap();
        let f2 = reader.next().await.unwrap().unwrap();
        let f3 = reader.next().await.unwrap().unwrap();

        assert_eq!((f1.tag, f1.payload.as_ref()), (1, b"one".as_ref()));
        assert_eq!((f2.tag, f2.payload.as_ref()), (2, b"two".as_ref()));
        assert_eq!((f3.tag, f3.payload.as_ref()), (3, b"three".as_ref()));
    }

    #[tokio::test]
    async fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_frame(4, b"slow", &mut wire).unwrap();
        encode_frame(5, &[0xAB; 300], &mut wire).unwrap();
        let wire = wire.freeze();

        let (mut tx, rx) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            for byte in wire.iter() {
                tx.write_all(&[*byte]).await.unwrap();
            }
        });

        let mut reader = FramedRead::new(rx, TagCodec::new());
        let first = reader.next().await.unwrap().unwrap();
        let second = reader.next().await.unwrap().unwrap();
        writer.await.unwrap();

        assert_eq!(first.tag, 4);
        assert_eq!(first.payload.as_ref(), b"slow");
        assert_eq!(second.tag, 5);
        assert_eq!(second.payload.len(), 300);
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u32_le(16);
        partial.put_u32_le(2);
        partial.put_slice(b"only-part");

        let mut reader = FramedRead::new(&partial[..], TagCodec::new());
        let err = reader.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[tokio::test]
    async fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        wire.put_u32_le(1024);
        wire.put_u32_le(1);

        let codec = TagCodec::with_config(FrameConfig {
            max_payload_size: 16,
        });
        let mut reader = FramedRead::new(&wire[..], codec);
        let err = reader.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 1024, max: 16 }));
    }

    #[tokio::test]
    async fn writer_rejects_oversized_payload() {
        let codec = TagCodec::with_config(FrameConfig {
            max_payload_size: 4,
        });
        let mut writer = FramedWrite::new(Vec::<u8>::new(), codec);

        let err = writer
            .send(Frame::new(1, Bytes::from_static(b"oversized")))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().is_empty());
    }

    #[tokio::test]
    async fn roundtrip_over_duplex() {
        let (left, right) = tokio::io::duplex(1024);
        let mut writer = FramedWrite::new(left, TagCodec::new());
        let mut reader = FramedRead::new(right, TagCodec::new());

        writer.send(Frame::new(11, &b"command"[..])).await.unwrap();
        writer.send(Frame::new(12, &b"data"[..])).await.unwrap();
        writer.send(Frame::new(13, Bytes::new())).await.unwrap();
        drop(writer);

        let f1 = reader.next().await.unwrap().unwrap();
        let f2 = reader.next().await.unwrap().unwrap();
        let f3 = reader.next().await.unwrap().unwrap();

        assert_eq!((f1.tag, f1.payload.as_ref()), (11, b"command".as_ref()));
        assert_eq!((f2.tag, f2.payload.as_ref()), (12, b"data".as_ref()));
        assert_eq!(f3.tag, 13);
        assert!(f3.payload.is_empty());
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn written_bytes_match_plain_encoder() {
        let mut writer = FramedWrite::new(Vec::<u8>::new(), TagCodec::new());
        writer.send(Frame::new(3, &b"z"[..])).await.unwrap();

        let written = writer.into_inner();
        assert_eq!(written.len(), HEADER_SIZE + 1);

        let mut expected = BytesMut::new();
        encode_frame(3, b"z", &mut expected).unwrap();
        assert_eq!(written.as_slice(), expected.as_ref());
    }
}
