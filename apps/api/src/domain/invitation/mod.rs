// Invitation domain module
// A pending offer from a team to a prospective member; existence means pending

#![allow(clippy::module_inception)]

pub mod invitation;

pub use invitation::Invitation;
