//! Core types for the rating system

pub mod frame;
pub mod labels;
pub mod metric;
pub mod record;
pub mod rules;
pub mod units;
