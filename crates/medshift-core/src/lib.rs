pub mod ids;
pub mod model;
pub mod plan;
pub mod snapshot;
pub mod types;

pub use ids::*;
pub use model::*;
pub use plan::*;
pub use snapshot::*;
pub use types::*;
