pub mod config;
pub mod error;
pub mod redistributor;
pub mod runner;
pub mod util;

pub use config::*;
pub use error::*;
pub use redistributor::*;
pub use runner::*;
pub use util::*;
