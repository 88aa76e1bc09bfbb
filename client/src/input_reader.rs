//! Line oriented stdin reading plus the prompt and message rendering used by
//! the front end

use std::io::{stdout, Write};

use tokio::io::{self, AsyncRead, Stdin};
use tokio_stream::StreamExt; // provides combinator methods like next on top of FramedRead and Stream trait
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::warn;

use irc_protocol::{Packet, MSG_LEN};

// clear the current line and return to column 0 before printing over the prompt
const CLEAR_LINE: &str = "\x1b[1K\r";

pub struct InputReader<R = Stdin> {
    fr: FramedRead<R, LinesCodec>,
}

impl InputReader<Stdin> {
    pub fn stdin() -> Self {
        InputReader::new(io::stdin())
    }
}

impl<R: AsyncRead + Unpin> InputReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            fr: FramedRead::new(input, LinesCodec::new_with_max_length(MSG_LEN - 1)),
        }
    }

    // next line without its terminator, None once input is exhausted
    pub async fn read(&mut self) -> Option<String> {
        let mut skipped = false;

        loop {
            match self.fr.next().await {
                Some(Ok(line)) => return Some(line),
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    warn!("Input line too long, discarded");
                    skipped = true;
                },
                Some(Err(LinesCodecError::Io(e))) => {
                    warn!("Unable to read input: {}", e);
                    return None
                },
                None if skipped => skipped = false, // FramedRead pauses once after an error
                None => return None,
            }
        }
    }
}

pub fn prompt(name: &str) -> io::Result<()> {
    let mut out = stdout();
    write!(out, "{}: ", name)?;
    out.flush() // Since stdout is line buffered need to explicitly flush
}

// "<sender>: <payload>" drawn over the pending prompt, then the prompt again
pub fn show_packet(packet: &Packet, name: &str) -> io::Result<()> {
    let mut out = stdout();
    let text = packet.text();
    write!(out, "{}{}: {}", CLEAR_LINE, packet.sender, text)?;
    if !text.ends_with('\n') {
        writeln!(out)?;
    }
    prompt(name)
}

pub fn show_notice(notice: &str, name: &str) -> io::Result<()> {
    println!("{}{}", CLEAR_LINE, notice);
    prompt(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_come_back_without_terminators() {
        let input: &[u8] = b"/nickname alice\r\nhello there\nlast";
        let mut reader = InputReader::new(input);

        assert_eq!(reader.read().await.as_deref(), Some("/nickname alice"));
        assert_eq!(reader.read().await.as_deref(), Some("hello there"));
        assert_eq!(reader.read().await.as_deref(), Some("last"));
        assert_eq!(reader.read().await, None);
    }
}
