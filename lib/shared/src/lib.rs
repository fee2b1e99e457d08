pub mod dataset;
pub mod record;
pub mod schema;

pub use dataset::Dataset;
pub use record::{Key, Record};
pub use schema::Field;
