//! Accept loop and connection dispatch.

pub mod listener;
