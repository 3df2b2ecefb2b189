//! Traits for CDC sources
//!
//! Database-agnostic trait definitions.

use crate::common::Result;
use async_trait::async_trait;

/// Trait for CDC source implementations
#[async_trait]
pub trait CdcSource: Send + Sync {
    /// Start capturing changes
    ///
    /// Spawns the background task that drives the mining cycle.
    async fn start(&mut self) -> Result<()>;

    /// Stop capturing changes
    ///
    /// Signals the background task to finish its current cycle and exit.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the source is healthy
    async fn is_healthy(&self) -> bool;
}

/// Configuration trait for CDC sources
pub trait CdcConfig: Send + Sync {
    /// Get the source type name (e.g., "oracle")
    fn source_type(&self) -> &'static str;

    /// Validate the configuration
    fn validate(&self) -> Result<()>;
}
