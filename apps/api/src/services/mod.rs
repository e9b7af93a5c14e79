// Application services
// Each public coordinator operation runs the component functions below inside
// one store transaction

pub mod coordinator;
pub mod invitations;
pub mod matching;
pub mod team_store;

pub use coordinator::TeamCoordinator;
