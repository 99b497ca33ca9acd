//! Byte stream to line framing.
//!
//! The modem terminates every response with `\r\n`. The decoder collects
//! bytes until `\n`, drops the trailing `\r`, and yields the line. Blank
//! lines (the modem sends plenty) are swallowed. A line that overflows
//! the buffer is discarded up to its terminator rather than delivered
//! truncated, since a cut-off `+MQTTSUBRECV` would parse as a shorter
//! payload.
//!
//! A single UART read may carry part of a line, one line, or several;
//! the decoder is fed incrementally and keeps its partial state.

/// Longest inbound line accepted: a full-MTU inbound message plus its
/// prefix and topic.
pub const LINE_MAX: usize = 1024 + 256;

/// Streaming line decoder.
pub struct LineDecoder {
    buf: [u8; LINE_MAX],
    len: usize,
    /// Set after an overflow until the next `\n`.
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub const fn new() -> Self {
        Self {
            buf: [0; LINE_MAX],
            len: 0,
            discarding: false,
        }
    }

    /// Push one byte. Returns the completed line when `byte` ends one.
    /// The slice is valid until the next call.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if byte == b'\n' {
            let len = core::mem::take(&mut self.len);
            if core::mem::take(&mut self.discarding) {
                return None;
            }
            let line = match self.buf[..len].split_last() {
                Some((b'\r', rest)) => rest,
                _ => &self.buf[..len],
            };
            return if line.is_empty() { None } else { Some(line) };
        }
        if self.discarding {
            return None;
        }
        if self.len == LINE_MAX {
            log::debug!("comms: line overflow, discarding");
            self.discarding = true;
            self.len = 0;
            return None;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        None
    }

    /// Feed a chunk, calling `on_line` for every line it completes.
    pub fn feed(&mut self, data: &[u8], mut on_line: impl FnMut(&[u8])) {
        for &b in data {
            if let Some(line) = self.push(b) {
                on_line(line);
            }
        }
    }
}
