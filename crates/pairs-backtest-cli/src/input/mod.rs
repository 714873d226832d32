pub mod bars;
pub mod file;
pub mod stdin;
