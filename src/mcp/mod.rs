//! rmcp server wiring: one `DbService` per session, all sharing the same
//! connector registry and access policy.

pub mod service;

pub use service::DbService;
