//! # Recipe Agent
//!
//! Chef Auguste, a voice assistant that helps callers find recipes and cook
//! them, served to a voice-AI platform as an SWML document.
//!
//! This library provides:
//! - Declarative webhook tools (DataMaps) against the Spoonacular recipe API
//! - Native kitchen tools and reusable skills (date/time, math)
//! - The agent definition: persona prompt, conversation contexts, speech settings
//! - An HTTP server answering SWML, SWAIG and post-prompt webhooks
//!
//! ## Example
//!
//! ```rust,ignore
//! use recipe_agent::{agent::build_recipe_agent, config::Config, tools::DataMapExecutor};
//!
//! let config = Config::from_env()?;
//! let agent = build_recipe_agent(&config, DataMapExecutor::new()?)?;
//! recipe_agent::api::serve(config, agent).await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod skills;
pub mod swml;
pub mod tools;

pub use config::Config;
