//! Content-addressed cache keys for generated STL artifacts.
//!
//! The key is the SHA-256 of an explicit string rendering of the generation
//! inputs. The rendering is not numerically normalized: `[1.0]` and `[1.00001]`
//! are different keys, and list order matters. Floats are rendered with
//! Rust's `Debug` formatting (`1.0`, `2.5`, `1e20`), lists as `[a, b, c]`.

use std::fmt::Write;

use sha2::{Digest, Sha256};

/// Version tag mixed into every key.
///
/// Bump when the rendering below or the slot recipe in [`crate::plan`]
/// changes, so artifacts built by an older recipe are never served.
pub const CACHE_KEY_VERSION: &str = "keychain-v1";

/// File extension for cached STL artifacts.
pub const STL_EXTENSION: &str = "stl";

/// Render the exact string that is hashed for a generation tuple.
pub fn cache_key_input(bar_heights: &[f64], base_model: &str, extrusion_height: f64) -> String {
    let mut out = String::with_capacity(32 + bar_heights.len() * 6 + base_model.len());
    out.push_str(CACHE_KEY_VERSION);
    out.push('|');
    // Writing to a String cannot fail.
    let _ = write!(out, "{bar_heights:?}_{base_model}_{extrusion_height:?}");
    out
}

/// Compute the hex cache key for a generation tuple.
pub fn cache_key(bar_heights: &[f64], base_model: &str, extrusion_height: f64) -> String {
    let input = cache_key_input(bar_heights, base_model, extrusion_height);
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Filename of the cached artifact for `key`.
pub fn cached_stl_filename(key: &str) -> String {
    format!("{key}.{STL_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_string_is_versioned_and_explicit() {
        let input = cache_key_input(&[1.0, 2.5, 3.0], "circle.step", 2.0);
        assert_eq!(input, "keychain-v1|[1.0, 2.5, 3.0]_circle.step_2.0");
    }

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let a = cache_key(&[1.0, 2.0], "circle.step", 3.0);
        let b = cache_key(&[1.0, 2.0], "circle.step", 3.0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn key_is_sha256_of_input_string() {
        // sha256 of "keychain-v1|[]_a_1.0"
        assert_eq!(
            cache_key(&[], "a", 1.0),
            "c3cf02b138039aa2b1d122d1d97f256302393e123c861a301006e3be7c6e63fc"
        );
    }

    #[test]
    fn bar_order_is_significant() {
        let a = cache_key(&[1.0, 2.0], "circle.step", 3.0);
        let b = cache_key(&[2.0, 1.0], "circle.step", 3.0);
        assert_ne!(a, b);
    }

    #[test]
    fn every_component_contributes() {
        let base = cache_key(&[1.0], "circle.step", 3.0);
        assert_ne!(base, cache_key(&[1.0], "square.step", 3.0));
        assert_ne!(base, cache_key(&[1.0], "circle.step", 3.5));
        assert_ne!(base, cache_key(&[1.0, 1.0], "circle.step", 3.0));
    }

    #[test]
    fn empty_bar_list_is_a_valid_key() {
        let input = cache_key_input(&[], "circle.step", 1.0);
        assert_eq!(input, "keychain-v1|[]_circle.step_1.0");
    }

    #[test]
    fn cached_filename_has_stl_extension() {
        assert_eq!(cached_stl_filename("abc"), "abc.stl");
    }
}
