pub mod capture;

pub use capture::{to_display_image, CaptureLoop, OpenCvCamera};
