//! Public API for kindalloc.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with [`Allocators`](alloc::Allocators).

pub mod alloc;
pub mod block;
pub mod config;
pub mod kind;
pub mod stats;
