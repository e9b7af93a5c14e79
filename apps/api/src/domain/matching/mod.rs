// Matching domain module
// A match request is a directed, transient offer between two ready teams

pub mod match_request;

pub use match_request::MatchRequest;
