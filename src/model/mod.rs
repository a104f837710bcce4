pub mod descriptor;
pub mod query;
pub mod record;
pub mod response;
pub mod tenant;
pub mod value_parser;

pub use descriptor::*;
pub use query::*;
pub use record::*;
pub use response::*;
pub use tenant::*;
pub use value_parser::*;
