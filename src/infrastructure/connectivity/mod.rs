pub mod watch_signal;

pub use watch_signal::WatchConnectivity;
