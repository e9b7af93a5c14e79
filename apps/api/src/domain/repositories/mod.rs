// Repository traits (ports) for the domain layer
// Every method runs inside the transaction it is called on

pub mod invitation_repository;
pub mod match_request_repository;
pub mod store;
pub mod team_repository;
pub mod user_directory;

pub use invitation_repository::InvitationRepository;
pub use match_request_repository::MatchRequestRepository;
pub use store::{Store, Transaction};
pub use team_repository::TeamRepository;
pub use user_directory::UserDirectory;
