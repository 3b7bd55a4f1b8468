//! Survey Service - survey intake, fire-alert lookup, database export and
//! prompt proxying to a local text-generation service.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
