//! # perch-git
//!
//! Reads what Perch needs from the local checkout: the current branch,
//! the HEAD commit and the Bitbucket repository behind `origin`.

mod error;
mod repository;

pub use error::{Error, Result};
pub use git2::Oid;
pub use repository::Repository;
