mod queue;
mod request;

pub use queue::RequestQueue;
pub use request::{Request, RequestRecord};
