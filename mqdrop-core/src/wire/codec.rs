use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FrameError;
use crate::wire::frame::{FRAME_HEADER_SIZE, Frame, FrameHeader, MAX_FRAME_PAYLOAD};

/// Length-delimited framing for [`Frame`]s over a byte stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct QueueCodec;

impl Decoder for QueueCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let header = FrameHeader::decode(&src[..FRAME_HEADER_SIZE])?;
        let payload_length = header.payload_length as usize;
        if header.payload_length > MAX_FRAME_PAYLOAD as u64 {
            return Err(FrameError::FrameTooLarge {
                size: payload_length,
                max: MAX_FRAME_PAYLOAD,
            });
        }

        let total = FRAME_HEADER_SIZE + payload_length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_SIZE);
        let payload = src.split_to(payload_length).freeze();
        Frame::from_parts(header, payload).map(Some)
    }
}

impl Encoder<Frame> for QueueCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(FRAME_HEADER_SIZE + item.payload().len());
        dst.put_slice(&item.header().encode());
        dst.put_slice(item.payload());
        Ok(())
    }
}
