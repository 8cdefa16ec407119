//! Event, condition and action engine for game mod projects.

pub mod catalog;
pub mod codegen;
pub mod model;
pub mod project;
pub mod resolve;
pub mod settings;
