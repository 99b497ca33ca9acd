//! Line hand-off between the UART reader and the comms owner task.
//!
//! ```text
//! ┌──────────────┐   InboundLine   ┌──────────────┐
//! │ UART reader  │───────────────▶│ comms owner  │
//! │ (LineDecoder)│  LINE_CHANNEL   │ (tick/lines) │
//! └──────────────┘                 └──────────────┘
//! ```
//!
//! The reader never blocks: when the owner falls behind, new lines are
//! dropped and counted by the caller's log.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

use super::codec::LINE_MAX;

/// One complete inbound line.
pub type InboundLine = Vec<u8, LINE_MAX>;

/// Lines buffered between reader and owner. Enough for a bring-up
/// reply burst (status push, `OK`, next push) across one poll period.
pub const LINE_DEPTH: usize = 16;

pub type LineChannel = Channel<CriticalSectionRawMutex, InboundLine, LINE_DEPTH>;

/// UART reader → comms owner.
pub static LINE_CHANNEL: LineChannel = Channel::new();

/// Enqueue a decoded line. `false` if the channel is full.
pub fn push_line(ch: &LineChannel, line: &[u8]) -> bool {
    let mut owned = InboundLine::new();
    if owned.extend_from_slice(line).is_err() {
        return false;
    }
    ch.try_send(owned).is_ok()
}

/// Dequeue the next line into `buf`, truncating to its length.
pub fn pop_line(ch: &LineChannel, buf: &mut [u8]) -> Option<usize> {
    let line = ch.try_receive().ok()?;
    let n = line.len().min(buf.len());
    buf[..n].copy_from_slice(&line[..n]);
    Some(n)
}
