pub mod aggregate;

pub use aggregate::{Contact, ContactId, SocialLinks};
