// Infrastructure layer module
// Persistence adapters implementing the domain's store ports

pub mod repositories;
