//! gdtx: GD&T extraction for STEP files
//!
//! Pulls geometric tolerances, dimensional tolerances and datum
//! references out of ISO 10303-21 part files without a full EXPRESS
//! parser, producing a flat result table suitable for review or export.

pub mod cli;
pub mod extract;
