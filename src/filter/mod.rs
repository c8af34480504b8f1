pub mod error;
pub mod features;
pub mod filter;
pub mod filter_order;
pub mod filter_where;
pub mod types;

pub use features::QueryFeatures;
pub use filter::Filter;
pub use types::*;
