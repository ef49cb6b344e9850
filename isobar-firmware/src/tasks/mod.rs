//! Embassy tasks and the control loop tick source

pub mod link;
pub mod net;
pub mod tick;

pub use link::link_task;
pub use net::{cyw43_task, net_task};
pub use tick::TickerSource;
