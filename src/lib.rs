//! Classify dishes as soup, salad or sandwich (or any other set of
//! categories) with a data-driven weighted scoring table.

pub mod config;
pub mod output;
pub mod quiz;
pub mod scoring;
