// Bearer token handling
// Tokens are issued elsewhere; this service only needs the acting user id

pub mod jwt;
