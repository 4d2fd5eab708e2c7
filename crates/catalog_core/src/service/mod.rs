//! Category use-case services.
//!
//! # Responsibility
//! - Orchestrate node store calls into category-level operations.
//! - Keep request decoding and transport layers decoupled from the store.

pub mod bulk_copy;
pub mod bulk_move;
pub mod category_service;
pub mod dependency;
pub mod reorder;
pub mod requests;
pub mod tree;
