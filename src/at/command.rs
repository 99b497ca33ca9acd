//! Outbound command-line formatting.
//!
//! Commands are rendered with `core::fmt::Write` into a fixed
//! [`CommandLine`] buffer; the CR/LF terminator is added only when the
//! line is framed for the wire.

use core::fmt::{self, Write};

use heapless::{String, Vec};

/// Longest command the engine will emit (publish announce with an
/// inline hex payload is the worst case).
pub const CMD_MAX_LEN: usize = 1024 + 128;

/// One rendered AT command, without terminator.
pub type CommandLine = String<CMD_MAX_LEN>;

/// A command framed for the wire (`<cmd>\r\n`).
pub type WireLine = Vec<u8, { CMD_MAX_LEN + 2 }>;

/// Reply published on `cmd/resp` after the command processor ran.
pub type ReplyJson = String<24>;

/// Append the CR/LF terminator.
pub fn frame(cmd: &str) -> Option<WireLine> {
    let mut out = WireLine::new();
    out.extend_from_slice(cmd.as_bytes()).ok()?;
    out.extend_from_slice(b"\r\n").ok()?;
    Some(out)
}

/// `{"ret_code":0xHH}`, two-digit uppercase hex.
pub fn reply_json(code: u8) -> ReplyJson {
    let mut s = ReplyJson::new();
    // 20 bytes max, always fits.
    let _ = write!(s, "{{\"ret_code\":0x{:02X}}}", code);
    s
}

/// String argument wrapped in double quotes, with the modem's
/// backslash escapes applied to `"`, `,` and `\`.
pub struct Quoted<'a>(pub &'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            if matches!(c, '"' | ',' | '\\') {
                f.write_char('\\')?;
            }
            f.write_char(c)?;
        }
        f.write_char('"')
    }
}

/// Bytes rendered as uppercase hex with no separators.
pub struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}
