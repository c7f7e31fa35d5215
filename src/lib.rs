pub mod clock;
pub mod config;
pub mod delay;
pub mod error;
pub mod observer;
pub mod order;
pub mod pod;
pub mod queue;
pub mod shelf;
pub(crate) mod workers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::ShelfPodConfig;
pub use error::PodError;
pub use observer::{ObserverHandle, ObserverRegistry, ShelfObserver};
pub use order::{Order, OrderSnapshot, OrderSpec, OrderState, ShelfTemperature, Temperature};
pub use pod::{AddResult, ShelfPod};
pub use shelf::Shelf;
