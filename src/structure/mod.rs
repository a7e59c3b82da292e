//! Content structuring: turning raw partitioned elements into content units.

mod sections;
mod structurer;
mod tables;
pub mod types;

pub use sections::detect_heading;
pub use structurer::structure;
pub use tables::flatten_table;
pub use types::{ContentType, ContentUnit, RawElement, StructureError, UnitMetadata};
