mod node;
mod resources;

pub use node::{Node, NodeRecord, Tier};
pub use resources::ResourceLedger;
