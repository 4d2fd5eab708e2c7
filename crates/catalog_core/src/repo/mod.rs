//! Node store boundary and the embedded SQLite implementation.
//!
//! # Responsibility
//! - Define the node store contract consumed by category services.
//! - Keep SQL details of the embedded store behind that contract.
//!
//! # Invariants
//! - Store APIs return semantic errors (`NodeNotFound`, `Conflict`) in
//!   addition to transport errors.

pub mod node_store;
pub mod sqlite_store;
