// User domain module
// The core only reads identity and gender, and maintains the current team pointer

#![allow(clippy::module_inception)]

pub mod user;
pub mod value_objects;

pub use user::User;
pub use value_objects::Gender;
