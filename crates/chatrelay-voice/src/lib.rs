//! Speech rendering and audio output for chatrelay.
//!
//! The pipeline treats both halves as external collaborators behind traits:
//! a [`SpeechRenderer`] turns text into an audio file, and an [`AudioSink`]
//! (obtained from a [`VoiceGateway`]) plays that file on a tenant's voice
//! connection and reports when playback has finished.
//!
//! Default implementations render through Google Translate TTS or a local
//! `espeak-ng`, and play through an external player process.

pub mod config;
pub mod error;
pub mod sink;
pub mod tts;

pub use config::{RendererKind, VoiceConfig};
pub use error::VoiceError;
pub use sink::{AudioSink, CommandPlayer, CommandPlayerGateway, VoiceGateway};
pub use tts::{build_renderer, EspeakTts, GoogleTranslateTts, RenderedAudio, SpeechRenderer};
