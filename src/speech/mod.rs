//! Reply chunking and narration

pub mod chunker;
pub mod narrator;

pub use chunker::{chunk_reply, is_delimiter};
pub use narrator::{speak_reply, Synthesizer};
