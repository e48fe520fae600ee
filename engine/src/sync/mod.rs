//! Lock-free building blocks shared across threads.

pub mod list;

pub use crossbeam::epoch::{Guard, pin};
pub use list::SortedList;
