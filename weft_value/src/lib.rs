pub mod format;
pub mod source_map;
pub mod value;
pub mod visitor;

pub use value::Value;
