pub mod health;
pub mod invitations;
pub mod matching;
pub mod teams;
