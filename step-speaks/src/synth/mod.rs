//! Synthesis backends.
//!
//! Two structurally different backends live here: the paid remote API
//! that returns audio bytes, and the free on-device engine that renders
//! live and only signals completion.

pub mod local;
pub mod remote;

pub use local::{HostSynthesizer, LocalSynthesizer, SpeechEngine};
pub use remote::{OpenAiSpeechClient, RemoteSynthesizer};
