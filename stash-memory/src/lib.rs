//! stash-memory: in-memory reference adapter for the Stash file
//! repository contract.
//!
//! Implements every contract operation over process memory, routing
//! each call through the hook execution pipeline and translating
//! storage signals into the uniform error taxonomy. Serves as the
//! conformance model for relational adapters.

mod repository;
mod users;

pub use repository::MemoryFileRepository;
pub use users::MemoryUserSource;
