//! Host-facing bindings for kernelkit.

pub mod api;
