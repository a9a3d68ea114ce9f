//! Audio and path utilities for lbai-studio

pub mod audio_decoder;
pub mod paths;
pub mod wav;
pub mod waveform;

pub use audio_decoder::{decode_audio_file, probe_duration};
pub use paths::safe_filename;
pub use wav::{concat_wavs, read_wav, wav_duration, write_silence, write_wav};
pub use waveform::Waveform;
