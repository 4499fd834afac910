pub mod env;
pub mod node;
pub mod request;
pub mod solver;

pub fn sorted_vec<T: Ord>(mut vec: Vec<T>) -> Vec<T> {
    vec.sort();
    vec
}

#[allow(unused)]
pub fn enable_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
