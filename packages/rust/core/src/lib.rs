//! Extraction-to-catalog reconciliation for frbsync.
//!
//! This crate takes typed burst candidates from the extraction oracle,
//! checks each against the catalog by name and by sky position, and inserts
//! the new ones (or reports what it would insert, in a dry run).

pub mod extraction;
pub mod field_map;
pub mod geometry;
pub mod merge;
pub mod pipeline;
pub mod resolver;
