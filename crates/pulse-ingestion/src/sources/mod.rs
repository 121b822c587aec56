//! Upstream producers of rows to classify.

pub mod github;

pub use github::GitHubIssuesClient;
