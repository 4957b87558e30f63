pub mod config;
pub mod error;
pub mod handle_map;
pub mod operation;

pub use error::{DriverError, DriverResult, HandleKind};
pub use operation::{Operation, Support};
