//! Text event-stream framing.
//!
//! Frames are blocks of `field: value` lines terminated by a blank line. Only
//! complete frames are yielded; an unterminated frame at end of stream is
//! dropped.
use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// One complete event-stream frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("frame line is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("frame exceeds {max_bytes} bytes")]
    FrameTooLarge { max_bytes: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct FrameDecoder {
    max_frame_bytes: usize,
    frame_bytes: usize,
    /// Bytes of `src` already searched for a line terminator.
    scan_offset: usize,
    bom_checked: bool,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_id: Option<String>,
}

impl FrameDecoder {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            max_frame_bytes,
            frame_bytes: 0,
            scan_offset: 0,
            bom_checked: false,
            data: String::new(),
            has_data: false,
            event: None,
            last_id: None,
        }
    }

    fn decode_lines(&mut self, src: &mut BytesMut, eof: bool) -> Result<Option<Frame>, FramingError> {
        if !self.bom_checked {
            if src.len() < BOM.len() && BOM.starts_with(&src[..]) && !eof {
                return Ok(None);
            }
            if src.starts_with(BOM) {
                src.advance(BOM.len());
            }
            self.bom_checked = true;
        }

        loop {
            let found = src[self.scan_offset..]
                .iter()
                .position(|b| *b == b'\n' || *b == b'\r');
            let Some(pos) = found.map(|offset| self.scan_offset + offset) else {
                self.check_size(src.len())?;
                self.scan_offset = src.len();
                return Ok(None);
            };
            let terminator_len = if src[pos] == b'\r' {
                match src.get(pos + 1) {
                    Some(b'\n') => 2,
                    Some(_) => 1,
                    // A lone CR may be the first half of CRLF.
                    None if !eof => {
                        self.scan_offset = pos;
                        return Ok(None);
                    }
                    None => 1,
                }
            } else {
                1
            };

            self.check_size(pos + terminator_len)?;
            self.frame_bytes += pos + terminator_len;
            let raw = src.split_to(pos + terminator_len);
            self.scan_offset = 0;
            let line = std::str::from_utf8(&raw[..pos])?;
            if let Some(frame) = self.process_line(line) {
                return Ok(Some(frame));
            }
        }
    }

    fn check_size(&self, incoming: usize) -> Result<(), FramingError> {
        if self.frame_bytes + incoming > self.max_frame_bytes {
            return Err(FramingError::FrameTooLarge {
                max_bytes: self.max_frame_bytes,
            });
        }
        Ok(())
    }

    fn process_line(&mut self, line: &str) -> Option<Frame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        self.frame_bytes = 0;
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(Frame {
            event,
            id: self.last_id.clone(),
            data: std::mem::take(&mut self.data),
        })
    }

    fn discard_partial(&mut self) {
        self.frame_bytes = 0;
        self.scan_offset = 0;
        self.data.clear();
        self.has_data = false;
        self.event = None;
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FramingError> {
        self.decode_lines(src, false)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FramingError> {
        if let Some(frame) = self.decode_lines(src, true)? {
            return Ok(Some(frame));
        }
        src.clear();
        self.discard_partial();
        Ok(None)
    }
}
