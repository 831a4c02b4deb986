pub mod checksum;
pub mod config;
pub mod entry;
pub mod ordering;
mod resolve;
pub mod table;

pub use entry::{is_definitely_equal, Entry, FileResult, GroupTag};
pub use table::EqualityTable;
