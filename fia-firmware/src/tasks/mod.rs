//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod bitmap_rx;
pub mod control_rx;
pub mod control_tx;
pub mod frame;

pub use bitmap_rx::bitmap_rx_task;
pub use control_rx::control_rx_task;
pub use control_tx::control_tx_task;
pub use frame::{frame_task, Scheduler};
