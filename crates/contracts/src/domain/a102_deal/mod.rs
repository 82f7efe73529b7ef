pub mod aggregate;

pub use aggregate::{Deal, DealId};
