//! rf-audio: the driver-adapter boundary (§6). A real-time `cpal` driver,
//! a null/mock driver for bounce mode and tests, device enumeration, and a
//! channel-backed `Notifier`.

mod config;
mod device;
mod driver;
mod error;
mod notify;
mod stream;

pub use config::*;
pub use device::*;
pub use driver::*;
pub use error::*;
pub use notify::*;
pub use stream::*;
