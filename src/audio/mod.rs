//! Audio capture: subprocess lifecycle, capture-file paths, device listing.

pub mod capture;
pub mod devices;
pub mod paths;

pub use capture::{CaptureBackend, CaptureError, CaptureProcess, DEFAULT_CAPTURE_PROGRAM};
pub use devices::{list_input_devices, AudioDevice};
pub use paths::{clear_recordings_dir, recordings_dir};
