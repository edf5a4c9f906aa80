//! Driving adapters: the batch runner and its CSV formats.

pub mod batch;
pub mod csv;
