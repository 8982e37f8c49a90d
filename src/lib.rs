//! Push container images to Google Artifact Registry
//!
//! The [`registry::ArtifactRegistry`] component validates its configuration
//! against the Artifact Registry locations listing, checks upload permissions
//! and pushes images through a container CLI.

pub mod config;
pub mod registry;
