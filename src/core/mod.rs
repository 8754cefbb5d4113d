pub mod backends;
pub mod debug_logger;
pub mod network;
pub mod poller;

pub use poller::{DashboardSnapshot, DashboardState, PollHandle, Poller};
