#[macro_use]
pub(crate) mod common;
pub mod clock;
pub mod config;
pub mod core;
pub mod ledger;
pub mod lifecycle;
pub mod request;
pub mod scheduler;
pub mod solver;

#[cfg(test)]
pub mod tests;
