mod test_batch;
mod test_greedy;

pub mod utils;
