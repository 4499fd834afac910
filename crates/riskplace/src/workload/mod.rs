pub mod generator;
pub mod infrastructure;
