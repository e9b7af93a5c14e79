// Repository implementations (data access layer)
// Adapters that implement domain repository interfaces

pub mod in_memory_store;
pub mod postgres_store;

pub use in_memory_store::InMemoryStore;
pub use postgres_store::PostgresStore;
