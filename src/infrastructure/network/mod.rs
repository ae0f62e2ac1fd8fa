pub mod connectivity_monitor;
pub mod http_transport;

pub use connectivity_monitor::ConnectivityMonitor;
pub use http_transport::HttpTransport;
