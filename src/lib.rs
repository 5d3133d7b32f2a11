pub mod clock;
pub mod config;
pub mod prom_metrics;
pub mod setup_check;
pub mod sheets;
pub mod store;
pub mod web;

pub use clock::{Clock, FixedClock, SystemClock};
pub use store::{DueDate, Partition, Status, Todo, TodoStore};
