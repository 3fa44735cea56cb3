pub mod dispatch;
pub mod share;
pub mod status;

pub use dispatch::{dispatch, report_error};
pub use share::{Share, ShareRequest, Shared, parse_port, shutdown_signal};
