//! Process management for kernel module commands
//!
//! Handles running loader/unloader executables and classifying their exit.

pub mod spawner;

pub use spawner::{classify, CommandLauncher, DryRunLauncher};
