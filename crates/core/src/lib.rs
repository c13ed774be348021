//! OpenAPI to IR compiler behind the `sdkgen` client generator.
//!
//! The pipeline reads an OpenAPI document, converts every component schema
//! into a flat registry of named models, collects operations into tagged
//! services, and then derives a narrowed IR per configured client:
//! tag filtering, reachability pruning and deduplication. Emitters consume
//! the derived IR and use [`ir::TypeProjector`] to spell types per target.

pub mod config;
pub mod error;
pub mod hooks;
pub mod ir;
pub mod naming;
pub mod openapi;
pub mod pipeline;

pub use error::{Error, Result};
