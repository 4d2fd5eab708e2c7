//! Slug derivation for category names.
//!
//! # Responsibility
//! - Convert display names into URL-safe path segments.
//! - Salt lossy conversions with a short checksum to reduce collisions.
//!
//! # Invariants
//! - Output only contains `[a-z0-9-]` and never starts/ends with `-`.
//! - Names that are plain ASCII letters, digits, spaces and hyphens are never salted.
//! - Derivation is deterministic for identical input.

use once_cell::sync::Lazy;
use regex::Regex;
use std::time::{SystemTime, UNIX_EPOCH};

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// Derives a slug from a display name.
///
/// Returns an empty string when nothing usable remains (for example a name
/// made only of ASCII punctuation); callers fall back to [`fallback_slug`].
pub fn slugify(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lower = trimmed.to_lowercase();
    let replaced = NON_SLUG_RE.replace_all(&lower, "-");
    let cleaned = replaced.trim_matches('-');
    let suffix = checksum_suffix(trimmed);

    if cleaned.is_empty() {
        if trimmed.is_ascii() {
            return String::new();
        }
        return format!("node-{suffix}");
    }

    if requires_slug_salt(trimmed) {
        return format!("{cleaned}-{suffix}");
    }
    cleaned.to_string()
}

/// Builds a time-seeded slug for names that slugify to nothing.
pub fn fallback_slug() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    format!("node-{nanos}")
}

/// Derives a slug, falling back to a time-seeded one when empty.
pub fn slug_or_fallback(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        return fallback_slug();
    }
    slug
}

fn requires_slug_salt(name: &str) -> bool {
    name.chars()
        .any(|ch| !(ch.is_ascii_alphanumeric() || ch == ' ' || ch == '-'))
}

fn checksum_suffix(name: &str) -> String {
    format!("{:04x}", crc32(name.as_bytes()) & 0xffff)
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC32_POLYNOMIAL;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}
