//! Category domain model.
//!
//! # Responsibility
//! - Define the category read model handed to callers.
//! - Provide the tri-state patch wrapper used by move/update inputs.
//! - Derive URL-safe slugs from display names.
//!
//! # Invariants
//! - `Category::children` is transient and only filled by tree aggregation.
//! - A slug never contains characters outside `[a-z0-9-]`.

pub mod category;
pub mod patch;
pub mod slug;
