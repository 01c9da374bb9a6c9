pub mod clock;
pub mod collector;
pub mod history;
pub mod metrics;
pub mod process;
pub mod procfs;
pub mod snapshot;
pub mod stat;
pub mod users;

#[doc(hidden)]
pub mod fixture;
