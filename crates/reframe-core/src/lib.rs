//! # reframe-core
//!
//! Core types and primitives for the Reframe frame transform engine.
//! This crate contains the foundational types shared across all Reframe crates:
//! frame buffers, frame naming, render strategies, configuration, content
//! hashing, and error types.

pub mod config;
pub mod error;
pub mod frame;
pub mod hash;
pub mod naming;
pub mod strategy;

pub use config::*;

pub use error::{ReframeError, ReframeResult};
pub use frame::{Frame, FrameBuffer, FrameRef};
pub use hash::ContentHash;
pub use naming::FrameNaming;
pub use strategy::RenderStrategy;
