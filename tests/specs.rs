//! Workspace-level black-box specs, run against the `sfctl` binary
//! (spec.md §6.1). Grounded on the teacher's `tests/specs.rs` harness
//! shape: one `mod` per resource directory under `tests/specs/`, a shared
//! `prelude` with the process-spawning helpers.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/cli/mod.rs"]
mod cli;
