pub mod color;
pub mod parameters;
