//! Response reader
//!
//! Collects drive output until one of a set of terminators appears or the
//! deadline passes.

use serde::{Deserialize, Serialize};
use std::io;
use std::time::{Duration, Instant};

use super::{codec, ProtocolError, Transport};

/// Wall-clock limit for one write or read operation
///
/// Expiry is cooperative: loops check it once per iteration, so a byte
/// operation already underway always completes.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    expires: Option<Instant>,
}

impl Deadline {
    /// Deadline `timeout` from now; `None` never expires
    pub fn after(timeout: Option<Duration>) -> Self {
        Self {
            expires: timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }

    /// Deadline that never expires
    pub fn unbounded() -> Self {
        Self { expires: None }
    }

    /// Whether the deadline has passed
    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|at| Instant::now() >= at)
    }

    /// Whether this deadline never expires
    pub fn is_unbounded(&self) -> bool {
        self.expires.is_none()
    }
}

/// Set of strings any of which ends a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminators(Vec<String>);

impl Terminators {
    /// Terminator set from strings; empty strings are dropped
    pub fn new<I, S>(terminators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            terminators
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        )
    }

    /// Just a line feed
    pub fn line() -> Self {
        Self::new(["\n"])
    }

    /// Line feed followed by the `"- "` prompt of a program/profile body
    pub fn continuation() -> Self {
        Self::new(["\n- "])
    }

    /// Marker printed once a running program has finished
    pub fn program_end() -> Self {
        Self::new(["*END\n"])
    }

    /// Terminator strings in priority order
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    fn is_single_line_feed(&self) -> bool {
        self.0.len() == 1 && self.0[0] == "\n"
    }

    /// End index (exclusive) of the earliest terminator in `buf`
    ///
    /// When two terminators start at the same position the one listed first wins.
    pub fn find_end(&self, buf: &[u8]) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for terminator in &self.0 {
            if let Some(start) = find_subslice(buf, terminator.as_bytes()) {
                match best {
                    Some((best_start, _)) if best_start <= start => {}
                    _ => best = Some((start, start + terminator.len())),
                }
            }
        }
        best.map(|(_, end)| end)
    }
}

impl Default for Terminators {
    /// A plain line feed, or a line feed followed by the continuation prompt
    fn default() -> Self {
        Self::new(["\n", "\n- "])
    }
}

impl From<&str> for Terminators {
    fn from(terminator: &str) -> Self {
        Self::new([terminator])
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read a response from the drive
///
/// Polls the transport every `poll_interval` until a terminator shows up or
/// `timeout` elapses, then drops anything after the earliest terminator.
/// Carriage returns and line feeds are kept. On timeout whatever arrived is
/// returned as is.
pub fn read_response<T: Transport + ?Sized>(
    transport: &mut T,
    timeout: Option<Duration>,
    terminators: &Terminators,
    poll_interval: Duration,
) -> Result<String, ProtocolError> {
    if timeout.is_none() && terminators.is_single_line_feed() {
        let line = read_until_line_feed(transport, poll_interval)?;
        return Ok(codec::decode(&line));
    }

    let deadline = Deadline::after(timeout);
    let mut buf: Vec<u8> = Vec::new();

    let end = loop {
        if let Some(end) = terminators.find_end(&buf) {
            break Some(end);
        }
        if deadline.is_expired() {
            break None;
        }
        std::thread::sleep(poll_interval);
        buf.extend(transport.read_available()?);
    };

    match end {
        Some(end) => buf.truncate(end),
        None => tracing::debug!(
            "read_response: deadline reached without terminator after {} bytes: {:?}",
            buf.len(),
            codec::decode(&buf)
        ),
    }

    Ok(codec::decode(&buf))
}

/// Blocking read of a single line, with no deadline
fn read_until_line_feed<T: Transport + ?Sized>(
    transport: &mut T,
    poll_interval: Duration,
) -> Result<Vec<u8>, ProtocolError> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match transport.read(&mut byte) {
            Ok(0) => std::thread::sleep(poll_interval),
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    return Ok(line);
                }
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                std::thread::sleep(poll_interval)
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{Read, Write};

    /// Hands out its bytes in fixed-size chunks, one chunk per poll
    struct Trickle {
        pending: VecDeque<u8>,
        chunk: usize,
    }

    impl Trickle {
        fn new(data: &[u8], chunk: usize) -> Self {
            Self {
                pending: data.iter().copied().collect(),
                chunk,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.pending.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.pending.pop_front().unwrap_or_default();
            }
            Ok(n)
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for Trickle {
        fn clear_input_buffer(&mut self) -> io::Result<()> {
            self.pending.clear();
            Ok(())
        }

        fn bytes_to_read(&mut self) -> io::Result<u32> {
            Ok(self.pending.len().min(self.chunk) as u32)
        }
    }

    #[test]
    fn test_earliest_terminator_wins() {
        let mut t = Trickle::new(b"*DRIVE1\n- extra", 64);
        let text = read_response(
            &mut t,
            Some(Duration::from_millis(200)),
            &Terminators::default(),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(text, "*DRIVE1\n");
    }

    #[test]
    fn test_continuation_terminator_alone() {
        let mut t = Trickle::new(b"DEF PROG1\r\n- leftover", 3);
        let text = read_response(
            &mut t,
            Some(Duration::from_millis(200)),
            &Terminators::continuation(),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(text, "DEF PROG1\r\n- ");
    }

    #[test]
    fn test_program_end_marker() {
        let mut t = Trickle::new(b"!RUN PROG1\r*A100\r*GO1\r*END\n", 4);
        let text = read_response(
            &mut t,
            Some(Duration::from_millis(200)),
            &Terminators::program_end(),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(text, "!RUN PROG1\r*A100\r*GO1\r*END\n");
    }

    #[test]
    fn test_timeout_returns_partial() {
        let mut t = Trickle::new(b"!DRIVE\r*DRI", 64);
        let text = read_response(
            &mut t,
            Some(Duration::from_millis(20)),
            &Terminators::line(),
            Duration::from_millis(1),
        )
        .unwrap();
        assert_eq!(text, "!DRIVE\r*DRI");
    }

    #[test]
    fn test_unbounded_line_read() {
        let mut t = Trickle::new(b"\r*DRIVE1\nnext", 2);
        let text = read_response(&mut t, None, &Terminators::line(), Duration::ZERO).unwrap();
        assert_eq!(text, "\r*DRIVE1\n");
        assert_eq!(t.pending.len(), 4);
    }

    #[test]
    fn test_find_end_tie_prefers_first_listed() {
        let t = Terminators::new(["\n- ", "\n"]);
        assert_eq!(t.find_end(b"X\n- Y"), Some(4));
        let t = Terminators::default();
        assert_eq!(t.find_end(b"X\n- Y"), Some(2));
        assert_eq!(t.find_end(b"no end"), None);
    }

    #[test]
    fn test_deadline() {
        assert!(!Deadline::unbounded().is_expired());
        assert!(Deadline::after(Some(Duration::ZERO)).is_expired());
        assert!(!Deadline::after(Some(Duration::from_secs(60))).is_expired());
        assert!(Deadline::after(None).is_unbounded());
    }
}
