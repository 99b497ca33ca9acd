//! Serial transport port.
//!
//! The engine writes fire-and-forget and reads whole lines. Framing from
//! raw UART bytes into lines is the adapter's job (see
//! [`LineDecoder`](super::codec::LineDecoder)); the ESP-IDF adapter lives
//! in `adapters::uart`.

/// Line-oriented serial link to the modem.
pub trait Transport {
    /// Queue `data` for transmission verbatim. Returns the number of bytes
    /// accepted; a short count is logged by the caller, never retried.
    fn send_raw(&mut self, data: &[u8]) -> usize;

    /// Copy the next complete, CR/LF-stripped line into `buf` and return
    /// its length. `None` when no line is pending. Lines longer than `buf`
    /// are truncated.
    fn read_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        let _ = buf;
        None
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_raw(&mut self, data: &[u8]) -> usize {
        (**self).send_raw(data)
    }

    fn read_line(&mut self, buf: &mut [u8]) -> Option<usize> {
        (**self).read_line(buf)
    }
}
