//! Controller Bridge library - turn gamepad input into app-aware actions.
//!
//! The binary wires these modules together; they are public so the
//! integration tests can drive the engine without hardware.
//!
//! # Modules
//!
//! - `input`: Controller sampling (gilrs, replay files, scripted mocks)
//! - `engine`: Edge detection, debounce, holds, analog scroll and the safety toggle
//! - `dispatch`: Where and how resolved actions run
//! - `config`: Mapping config loading, validation and hot reload
//! - `profile`: Frontmost-app to profile resolution
//! - `runtime`: The fixed-period input loop
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod permissions;
pub mod profile;
pub mod runtime;
