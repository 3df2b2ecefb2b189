//! # Common CDC Types and Traits
//!
//! Source-agnostic pieces shared by the LogMiner source:
//!
//! - [`CdcError`] - Error taxonomy with retry classification
//! - [`CdcSource`] / [`CdcConfig`] - Source lifecycle and configuration traits
//! - [`RetryConfig`] - Exponential back-off for failed cycles
//! - [`OffsetStore`] - Durable low-water mark ([`FileOffsetStore`], [`MemoryOffsetStore`])

mod checkpoint;
mod error;
mod resilience;
mod traits;

pub use checkpoint::*;
pub use error::*;
pub use resilience::*;
pub use traits::*;
