pub mod client;
pub mod probe;
pub mod proxy;
pub mod types;

// Re-export commonly used items
pub use client::{HttpClientTrait, HttpResponse, IsahcHttpClient, SendError};
pub use probe::{ClockTrait, NetworkProbe, NetworkStatus, StatusStore, SystemClock};
pub use proxy::FailoverProxy;
pub use types::*;
