pub mod cli;
pub mod commands;
pub mod error;

pub use vellum_core::{backends, dom, handlers, pipeline, preferences, render, session, utils};
