pub mod fields;
pub mod reader;
pub mod shift;
pub mod tests;
pub mod writer;
