//! Speech-to-text transcription backends.

mod groq;

pub use groq::{GroqClient, Transcriber, TranscriptionError};
