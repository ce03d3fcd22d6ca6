//! Streaming decoder for concatenated, undelimited JSON values.
//!
//! The refactoring detector writes one output file per commit containing N
//! syntactically complete JSON objects back to back, with no separators: not
//! a JSON array, not newline-delimited. [`RecordStream`] turns such a byte
//! stream into the N decoded values, lazily and in order.
//!
//! Value boundaries are found with a brace/bracket depth scanner that is
//! string- and escape-aware, so each complete value is decoded exactly once.

pub mod decode;

pub use decode::RecordStream;
