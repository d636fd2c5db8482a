pub mod controller;
pub mod jump;
pub mod keys;
pub mod pause;
pub mod zones;

pub use controller::{Controller, FpsCounter};
pub use jump::{JumpDebouncer, JumpPhase};
pub use keys::{DispatchError, KeyDispatch, KeyId, KeySet, KeySynchronizer, LogDispatch};
pub use pause::{PauseControl, PauseStatus};
pub use zones::{Action, Classification, PixelRect, Region, ZoneClassifier};
