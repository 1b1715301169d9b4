//! # Profile App Library
//!
//! This library exposes the core modules of the application for integration testing.

pub mod clients;
pub mod feed;
pub mod lifecycle;
pub mod model;
pub mod profile;
