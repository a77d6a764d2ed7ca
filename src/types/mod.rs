//! Core domain types shared across the pipeline.

pub mod ids;

pub use ids::{RemoteRepoId, RepoName};
