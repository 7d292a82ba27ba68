//! Input and output records for the classification pipeline.

pub mod posts;
