//! Spam-gated auto-publication for hierarchical content repositories.
//!
//! Lifecycle events on content nodes are classified through a remote spam
//! classification service; the verdict and the closest configuration in the
//! node's ancestry decide whether the document is published, put up for
//! review, left alone or refused outright.

pub mod app;
pub mod classifier;
pub mod config;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod repository;
pub mod tasks;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
