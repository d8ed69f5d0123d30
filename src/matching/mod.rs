pub mod duplicates;
pub mod name;

pub use duplicates::{find_duplicates, DuplicateReport};
pub use name::normalize;
