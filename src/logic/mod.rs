pub mod assemble;
pub mod bucket;
pub mod orchestrator;
pub mod query_builder;
pub mod validate;

pub use assemble::*;
pub use bucket::*;
pub use orchestrator::*;
pub use query_builder::*;
pub use validate::*;
