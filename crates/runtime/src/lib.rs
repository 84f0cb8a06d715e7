pub mod driver;
pub mod process;
pub mod sink;

#[cfg(test)]
pub(crate) mod testutil;

pub use driver::spawn_update_driver;
pub use process::{CycleOptions, CycleReport, RemoteProbe, UpdateProcess};
pub use sink::{LogSink, NotificationSink};
