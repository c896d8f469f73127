//! Terminal front end: one-shot conversions and config bootstrap.

pub mod convert;
pub mod setup;
pub mod ui;
