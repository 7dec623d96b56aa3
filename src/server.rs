//! Line-oriented sample server.
//!
//! ```text
//! GET <n>  ->  (3n + 7) mod 2^32
//! QUIT     ->  OK, then the connection closes
//! other    ->  ERR
//! ```
//!
//! A `GET` whose argument is not an integer is answered with `ERR` and the
//! connection stays open. Integers of any size are accepted; only their
//! residue mod 2^32 matters. Lines that are not valid UTF-8 get `ERR` too.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

/// Deterministic sample for an index given mod 2^32.
pub fn sample(n: u32) -> u32 {
    n.wrapping_mul(3).wrapping_add(7)
}

/// Decimal integer of arbitrary length, reduced mod 2^32 (two's complement
/// for negatives). `None` unless the text is an optional sign plus digits.
pub fn parse_index(text: &str) -> Option<u32> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() {
        return None;
    }
    let mut residue: u32 = 0;
    for c in digits.chars() {
        let d = c.to_digit(10)?;
        residue = residue.wrapping_mul(10).wrapping_add(d);
    }
    Some(if negative { residue.wrapping_neg() } else { residue })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Get(u32),
    Quit,
    Invalid,
}

impl Request {
    /// `None` for blank lines, which get no reply.
    pub fn parse(line: &str) -> Option<Request> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (cmd, args) = parts.split_first()?;

        let request = if cmd.eq_ignore_ascii_case("GET") {
            match args {
                [n] => parse_index(n).map_or(Request::Invalid, Request::Get),
                _ => Request::Invalid,
            }
        } else if cmd.eq_ignore_ascii_case("QUIT") {
            Request::Quit
        } else {
            Request::Invalid
        };
        Some(request)
    }
}

/// Serve one connection until QUIT or end of input.
pub fn handle_connection<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let request = match std::str::from_utf8(&buf) {
            Ok(line) => Request::parse(line),
            Err(_) => Some(Request::Invalid),
        };
        match request {
            None => continue,
            Some(Request::Get(n)) => writeln!(writer, "{}", sample(n))?,
            Some(Request::Quit) => {
                writeln!(writer, "OK")?;
                writer.flush()?;
                return Ok(());
            }
            Some(Request::Invalid) => writeln!(writer, "ERR")?,
        }
        writer.flush()?;
    }
}

fn handle_client(stream: TcpStream) -> io::Result<()> {
    let peer = stream.peer_addr()?;
    log::debug!("Client connected: {}", peer);
    let reader = BufReader::new(stream.try_clone()?);
    handle_connection(reader, &stream)?;
    log::debug!("Client disconnected: {}", peer);
    Ok(())
}

/// Accept forever, one thread per connection.
pub fn serve(listener: TcpListener) -> io::Result<()> {
    log::info!("Sample server listening on {}", listener.local_addr()?);
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream) {
                        log::warn!("Connection error: {}", e);
                    }
                });
            }
            Err(e) => log::warn!("Failed to accept connection: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converse(input: &str) -> String {
        converse_bytes(input.as_bytes())
    }

    fn converse_bytes(input: &[u8]) -> String {
        let mut out = Vec::new();
        handle_connection(input, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn sample_values() {
        assert_eq!(sample(0), 7);
        assert_eq!(sample(10), 37);
        assert_eq!(sample(1_431_655_764), 3); // 3n + 7 = 2^32 + 3
        assert_eq!(sample(u32::MAX), 4); // n = -1
    }

    #[test]
    fn indices_reduce_mod_2_32() {
        assert_eq!(parse_index("42"), Some(42));
        assert_eq!(parse_index("+42"), Some(42));
        assert_eq!(parse_index("-1"), Some(u32::MAX));
        assert_eq!(parse_index("4294967296"), Some(0));
        // 10^19 mod 2^32
        assert_eq!(parse_index("10000000000000000000"), Some(2_313_682_944));
        assert_eq!(parse_index("-"), None);
        assert_eq!(parse_index("1e3"), None);
        assert_eq!(parse_index("--1"), None);
    }

    #[test]
    fn parses_requests() {
        assert_eq!(Request::parse("GET 5"), Some(Request::Get(5)));
        assert_eq!(Request::parse("GET -1"), Some(Request::Get(u32::MAX)));
        assert_eq!(Request::parse("  get   12 "), Some(Request::Get(12)));
        assert_eq!(Request::parse("QUIT"), Some(Request::Quit));
        assert_eq!(Request::parse("quit now"), Some(Request::Quit));
        assert_eq!(Request::parse("GET"), Some(Request::Invalid));
        assert_eq!(Request::parse("GET 1 2"), Some(Request::Invalid));
        assert_eq!(Request::parse("GET abc"), Some(Request::Invalid));
        assert_eq!(Request::parse("HELLO"), Some(Request::Invalid));
        assert_eq!(Request::parse("   "), None);
    }

    #[test]
    fn conversation_stops_at_quit() {
        let reply = converse("GET 0\nGET 10\nBOGUS\n\nGET x\nQUIT\nGET 1\n");
        assert_eq!(reply, "7\n37\nERR\nERR\nOK\n");
    }

    #[test]
    fn huge_indices_are_answered() {
        assert_eq!(converse("GET 10000000000000000000\n"), "2646081543\n");
        assert_eq!(converse("GET -1\n"), "4\n");
    }

    #[test]
    fn invalid_utf8_gets_err_and_keeps_connection() {
        let reply = converse_bytes(b"\xff\xfe\nGET 0\nQUIT\n");
        assert_eq!(reply, "ERR\n7\nOK\n");
    }

    #[test]
    fn end_of_input_closes_quietly() {
        assert_eq!(converse("GET 2"), "13\n");
        assert_eq!(converse(""), "");
    }
}
