//! Services layer (ports + adapters).
//!
//! - `ports`: pure contracts/types shared by the host and the adapters.
//! - `adapters`: OS/runtime specific implementations (processes, files, async).
//! - `bus`: the queue that carries callbacks back to the host's thread.

pub mod adapters;
pub mod bus;
pub mod ports;

pub use bus::{main_queue, MainQueue, MainQueueSender};
