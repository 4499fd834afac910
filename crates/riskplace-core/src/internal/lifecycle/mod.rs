mod allocation;

pub use allocation::{Allocation, AllocationLifecycle, Reclaimed};
