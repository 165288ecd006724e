mod audio;

pub use audio::{AudioBuffer, AudioFormat, AudioSource, SampleRate};
