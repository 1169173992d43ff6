pub mod choquet;
pub mod criterion;
pub mod gini;
pub mod variation;
pub mod weighted;

pub use choquet::g3f;
pub use criterion::Criterion;
pub use gini::ggf;
pub use variation::cv;
pub use weighted::ws;
