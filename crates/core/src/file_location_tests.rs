// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn rejects_empty_path() {
    assert!(sanitize_path("").is_err());
}

#[test]
fn rejects_non_absolute_path() {
    assert!(sanitize_path("foo/bar").is_err());
}

#[test]
fn rejects_unallowed_characters() {
    for bad in ["/a b", "/a~b", "/a*b", "/a?b", "/a\"b", "/a&b", "/a`b", "/a\\b"] {
        assert!(sanitize_path(bad).is_err(), "expected {bad:?} to be rejected");
    }
}

#[test]
fn adds_trailing_slash() {
    assert_eq!(sanitize_path("/foo/bar").unwrap(), "/foo/bar/");
}

#[test]
fn collapses_dot_segments() {
    assert_eq!(sanitize_path("/foo/./bar/").unwrap(), "/foo/bar/");
}

#[test]
fn collapses_empty_segments() {
    assert_eq!(sanitize_path("/foo//bar/").unwrap(), "/foo/bar/");
}

#[test]
fn resolves_dotdot_by_popping() {
    assert_eq!(sanitize_path("/foo/bar/../baz/").unwrap(), "/foo/baz/");
}

#[test]
fn dotdot_underflow_is_invalid_argument() {
    assert!(matches!(sanitize_path("/../foo"), Err(CoreError::InvalidArgument(_))));
}

#[test]
fn root_path_sanitizes_to_root() {
    assert_eq!(sanitize_path("/").unwrap(), "/");
}

#[test]
fn file_location_display_string() {
    // Root mount point "/" is concatenated as-is with the sanitized path,
    // matching the storage service's own display convention.
    let loc = FileLocation::new("ss1", "/data/in").unwrap();
    assert_eq!(loc.to_display_string(), "ss1://data/in/");
}

#[test]
fn via_proxy_sets_proxy_service() {
    let loc = FileLocation::via_proxy("proxy1", "ss1", "/data").unwrap();
    assert_eq!(loc.proxy_service(), Some("proxy1"));
    assert_eq!(loc.storage_service(), "ss1");
}
