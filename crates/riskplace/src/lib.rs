#![deny(clippy::await_holding_refcell_ref)]

pub mod common;
pub mod load;
pub mod output;
pub mod simulation;
pub mod workload;

pub type Error = crate::common::error::AppError;
pub type Result<T> = std::result::Result<T, Error>;

// Reexports
pub use riskplace_core;
