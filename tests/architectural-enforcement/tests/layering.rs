//! Integration Test: Core Layering
//!
//! The conversation core is headless. Terminal rendering lives in the TUI
//! crate only, so another surface can embed the core without pulling it in.

use std::fs;

use architectural_enforcement::{assert_clean, find_violations, workspace_root};

const UI_CRATES: [&str; 2] = ["ratatui", "crossterm"];

#[test]
fn test_core_sources_do_not_use_terminal_crates() {
    let violations = find_violations(&["conductor/core/src"], |code| {
        UI_CRATES.iter().any(|krate| code.contains(&format!("{krate}::")))
    });
    assert_clean("core layering", &violations);
}

#[test]
fn test_core_manifest_has_no_terminal_crates() {
    let manifest = fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml")).unwrap();
    for krate in UI_CRATES {
        assert!(
            !manifest.lines().any(|l| l.trim_start().starts_with(krate)),
            "chatkit-core depends on {krate}"
        );
    }
}

#[test]
fn test_tui_depends_on_core() {
    let manifest = fs::read_to_string(workspace_root().join("tui/Cargo.toml")).unwrap();
    assert!(manifest.contains("chatkit-core"));
}
