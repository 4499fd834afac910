pub mod batch;
pub mod cost;
pub mod eligibility;
pub mod greedy;
pub mod pass;
pub mod repair;
