//! # perch-core
//!
//! Core library for Perch: the hidden markers that tag Perch's comments,
//! deciding which comments a run owns, review results and their rendering,
//! and publishing those results to a Bitbucket pull request.

pub mod config;
pub mod error;
pub mod marker;
pub mod ownership;
pub mod publisher;
pub mod results;
pub mod template;

pub use config::{Config, StatusConfig};
pub use error::{Error, Result};
pub use marker::{Location, Marker, MarkerId};
pub use ownership::InlineComment;
pub use publisher::{PublishSummary, Publisher};
pub use results::{Results, Severity, Violation};
