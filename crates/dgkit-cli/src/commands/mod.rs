pub mod data;
pub mod query;
pub mod schema;
pub mod token;
