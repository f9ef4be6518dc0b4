//! Exchange integrations for funding spread scanning.
//!
//! All exchanges are read through one generic, descriptor-driven REST
//! adapter. Each exchange differs only by data:
//! - Endpoint paths and where the symbol/rate/volume fields live
//! - Funding interval (1h, 4h, 8h) used to rescale rates to 8h
//! - Symbol spelling quirks removed before normalization

mod client;
pub mod mock;
pub mod symbol;
mod traits;
mod types;

pub use client::{build_http_client, RestAdapter};
pub use mock::MockFundingSource;
pub use symbol::normalize_symbol;
pub use traits::FundingSource;
pub use types::*;
