pub mod smooth;
pub mod subject;

pub use smooth::{DeadZoneFilter, ReferenceSmoother};
pub use subject::{ReferenceFrame, ShoulderObservation, SubjectTracker, TrackingEvent};
