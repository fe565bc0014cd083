//! Purpose: Library crate bridging hosts to the kernel ipset subsystem via libipset.
//! Exports: `api` (public surface), `core` (session output, argument resolution, errors).
//! Role: Backs the `ipset-bridge` CLI and embedding hosts.
//! Invariants: The XML output of a session is passed through untouched.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state; the libipset
//! binding is the one exception (its print hook has no user pointer).
pub mod api;
pub mod core;
