//! Build pipeline module for crxpack
//!
//! Provides the task graph that turns the extension source tree into the
//! release directory.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Find source files using glob patterns from config
//! - **Graph**: Compose named tasks into series/parallel entry points
//! - **Execution**: Run each task against the build context
//!
//! # Example
//!
//! ```ignore
//! use crxpack::build::{evaluate, BuildContext, Pipeline, Target};
//! use crxpack::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//! let pipeline = Pipeline::new(context);
//!
//! let result = evaluate(&Target::Publish.graph(), &pipeline);
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod graph;
pub mod pipeline;
pub mod result;
pub mod target;

pub use context::*;
pub use discovery::*;
pub use graph::*;
pub use pipeline::*;
pub use result::*;
pub use target::*;
