// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn compute_is_deterministic() {
    let a = Fingerprint::compute("https://github.com/acme/widgets.git");
    let b = Fingerprint::compute("https://github.com/acme/widgets.git");
    assert_eq!(a, b);
}

#[test]
fn compute_normalizes_trailing_slash() {
    let a = Fingerprint::compute("https://github.com/acme/widgets");
    let b = Fingerprint::compute("https://github.com/acme/widgets/");
    assert_eq!(a, b);
}

#[test]
fn compute_normalizes_dot_git_suffix() {
    let a = Fingerprint::compute("https://github.com/acme/widgets");
    let b = Fingerprint::compute("https://github.com/acme/widgets.git");
    assert_eq!(a, b);
}

#[test]
fn compute_normalizes_case() {
    let a = Fingerprint::compute("https://github.com/Acme/Widgets.git");
    let b = Fingerprint::compute("https://github.com/acme/widgets");
    assert_eq!(a, b);
}

#[test]
fn compute_distinguishes_different_repos() {
    let a = Fingerprint::compute("https://github.com/acme/widgets");
    let b = Fingerprint::compute("https://github.com/acme/gadgets");
    assert_ne!(a, b);
}

#[test]
fn compute_distinguishes_ssh_from_https_url() {
    let ssh = Fingerprint::compute("git@github.com:acme/widgets.git");
    let https = Fingerprint::compute("https://github.com/acme/widgets.git");
    assert_ne!(ssh, https);
}

#[test]
fn as_str_returns_hex_digest() {
    let fp = Fingerprint::compute("https://example.com/repo");
    assert_eq!(fp.as_str().len(), 64);
    assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}
