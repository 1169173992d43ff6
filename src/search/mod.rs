pub mod arena;
pub mod belief;
pub mod config;
pub mod history;
pub mod node;
pub mod planner;
pub mod ucb;
pub mod value;

pub use arena::Arena;
pub use belief::Belief;
pub use config::SearchConfig;
pub use history::History;
pub use node::NodeId;
pub use node::QNode;
pub use node::VNode;
pub use planner::Planner;
