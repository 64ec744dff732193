// Vocal Range Core - real-time vocal pitch capture engine
// Frame-synchronous pitch estimation, sustained-note capture and range classification

// Module declarations
pub mod analysis;
pub mod audio;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod error;
pub mod note;
pub mod session;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{McLeodDetector, PitchDetector, PitchSample};
pub use capture::{CaptureEvent, CaptureSource, CaptureState, CapturedExtreme, Extreme};
pub use classifier::{VocalRangeResult, VoiceType};
pub use config::AppConfig;
pub use error::{AudioError, CaptureError, ErrorCode};
pub use note::{note_from_frequency, NoteInfo, NoteLetter};
pub use session::SessionController;
