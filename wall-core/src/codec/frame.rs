use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::error::WallError;

/// Upper bound for a single inbound frame, matching the wall's receive buffer.
pub const MAX_FRAME_SIZE: usize = 1024;

/// Frames JSON objects on the wall's TCP stream.
///
/// Outbound messages are written as one line each. Inbound frames are
/// delimited by brace depth rather than by newline, because the wall does
/// not reliably terminate its replies and may coalesce several objects
/// into one segment. Junk between objects is skipped and an object that
/// grows past [`MAX_FRAME_SIZE`] is discarded without failing the stream.
#[derive(Debug)]
pub struct WallCodec {
    max_frame: usize,
    /// Bytes of the current candidate frame already scanned.
    scanned: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    /// Inside an oversized object whose head was already dropped.
    discarding: bool,
}

impl WallCodec {
    pub fn new() -> Self {
        Self::with_max_frame(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            max_frame,
            scanned: 0,
            depth: 0,
            in_string: false,
            escaped: false,
            discarding: false,
        }
    }

    fn reset_scan(&mut self) {
        self.scanned = 0;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.discarding = false;
    }

    /// Consume the rest of a dropped object; `true` once it has closed.
    fn skip_dropped(&mut self, src: &mut BytesMut) -> bool {
        let mut consumed = 0;
        let mut closed = false;
        for &b in src.iter() {
            consumed += 1;
            if self.step(b) {
                closed = true;
                break;
            }
        }
        src.advance(consumed);
        if closed {
            self.reset_scan();
        }
        closed
    }

    /// Advance the scanner by one byte; returns `true` when the top-level
    /// object closes.
    fn step(&mut self, b: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == b'"' {
                self.in_string = false;
            }
            return false;
        }
        match b {
            b'"' => self.in_string = true,
            b'{' => self.depth += 1,
            b'}' => {
                self.depth = self.depth.saturating_sub(1);
                return self.depth == 0;
            }
            _ => {}
        }
        false
    }
}

impl Default for WallCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for WallCodec {
    type Item = String;
    type Error = WallError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.discarding {
                if !self.skip_dropped(src) {
                    return Ok(None);
                }
                continue;
            }

            if self.depth == 0 {
                match src.iter().position(|&b| b == b'{') {
                    Some(start) => src.advance(start),
                    None => {
                        src.clear();
                        return Ok(None);
                    }
                }
                self.reset_scan();
            }

            let mut complete = false;
            while self.scanned < src.len() {
                let b = src[self.scanned];
                self.scanned += 1;
                if self.step(b) {
                    complete = true;
                    break;
                }
                if self.scanned > self.max_frame {
                    break;
                }
            }

            if complete {
                let frame = src.split_to(self.scanned);
                self.reset_scan();
                match String::from_utf8(frame.to_vec()) {
                    Ok(text) => {
                        debug!(frame = %text, "inbound frame");
                        return Ok(Some(text));
                    }
                    Err(e) => {
                        warn!("dropping non-utf8 frame: {e}");
                        continue;
                    }
                }
            }

            if self.scanned > self.max_frame {
                warn!(
                    max = self.max_frame,
                    "dropping oversized frame without closing brace"
                );
                // nesting state is kept so the tail is skipped up to its closing brace
                src.advance(self.scanned);
                self.scanned = 0;
                self.discarding = true;
                continue;
            }

            return Ok(None);
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !src.is_empty() {
                    warn!(bytes = src.len(), "dropping truncated frame at end of stream");
                    src.clear();
                }
                self.reset_scan();
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for WallCodec {
    type Error = WallError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
