use std::io::Read;

use quarry_core::QuarryError;
use serde_json::Value;

const READ_CHUNK: usize = 8 * 1024;

/// Lazy iterator over the complete top-level JSON values in a byte stream.
///
/// The stream is expected to be the concatenation of zero or more complete
/// JSON objects or arrays with nothing between them (whitespace is
/// tolerated). Each complete value is decoded exactly once; a complete slice
/// that fails to decode is yielded as an `Err` item so the caller can skip
/// that record and continue. A trailing incomplete value at end of input is
/// discarded, and a stream with no complete values yields nothing — neither
/// case is an error.
///
/// Behavior is independent of how the underlying reader chunks its bytes.
///
/// # Examples
///
/// ```
/// use quarry_stream::RecordStream;
///
/// let input = r#"{"a":1}{"b":2}"#;
/// let values: Vec<_> = RecordStream::new(input.as_bytes())
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(values.len(), 2);
/// assert_eq!(values[0]["a"], 1);
/// assert_eq!(values[1]["b"], 2);
/// ```
pub struct RecordStream<R: Read> {
    reader: R,
    buf: Vec<u8>,
    /// Scan position within `buf`; bytes before it have been examined.
    pos: usize,
    /// Offset in `buf` where the value being scanned started.
    start: Option<usize>,
    depth: usize,
    in_string: bool,
    escaped: bool,
    eof: bool,
}

impl<R: Read> RecordStream<R> {
    /// Wrap a reader producing concatenated JSON values.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            start: None,
            depth: 0,
            in_string: false,
            escaped: false,
            eof: false,
        }
    }

    /// Advance the scanner by one byte. Returns `true` when the byte closes
    /// a complete top-level value ending at the current position.
    fn step(&mut self, byte: u8) -> bool {
        if self.start.is_none() {
            match byte {
                b'{' | b'[' => {
                    self.start = Some(self.pos);
                    self.depth = 1;
                }
                // Whitespace between values, or stray bytes that cannot
                // begin a value: skip. The contract promises well-formed
                // concatenation, so this path is defensive.
                _ => {}
            }
            return false;
        }

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            return false;
        }

        match byte {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth -= 1;
                if self.depth == 0 {
                    return true;
                }
            }
            _ => {}
        }
        false
    }

    /// Pull more bytes from the reader. Returns `false` at end of input.
    fn fill(&mut self) -> std::io::Result<bool> {
        // Drop bytes already scanned past when no value is in flight, so
        // whitespace runs between values never accumulate.
        if self.start.is_none() && self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }

        let mut chunk = [0u8; READ_CHUNK];
        let n = self.reader.read(&mut chunk)?;
        if n == 0 {
            return Ok(false);
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(true)
    }

    /// Slice out the completed value ending at `self.pos`, decode it, and
    /// reset scanner state for the next value.
    fn take_value(&mut self) -> Result<Value, QuarryError> {
        let start = self.start.take().expect("completed value has a start");
        let end = self.pos + 1;
        let decoded = serde_json::from_slice(&self.buf[start..end])
            .map_err(|e| QuarryError::Decode(format!("record at byte {start}: {e}")));

        self.buf.drain(..end);
        self.pos = 0;
        self.depth = 0;
        self.in_string = false;
        self.escaped = false;
        decoded
    }
}

impl<R: Read> Iterator for RecordStream<R> {
    type Item = Result<Value, QuarryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            while self.pos < self.buf.len() {
                let byte = self.buf[self.pos];
                let complete = self.step(byte);
                if complete {
                    let value = self.take_value();
                    return Some(value);
                }
                self.pos += 1;
            }

            if self.eof {
                return None;
            }
            match self.fill() {
                Ok(true) => {}
                Ok(false) => {
                    // End of input: a partial value still in the buffer is
                    // incomplete by definition and is discarded.
                    self.eof = true;
                    return None;
                }
                Err(e) => {
                    self.eof = true;
                    return Some(Err(QuarryError::Io(e)));
                }
            }
        }
    }
}
