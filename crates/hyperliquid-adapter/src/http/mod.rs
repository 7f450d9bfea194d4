/*
[INPUT]:  HTTP client configuration and API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod assets;
pub mod client;
pub mod error;
pub mod exchange;
pub mod info;

pub use error::{HyperliquidError, Result};

pub use assets::AssetMap;
pub use client::HyperliquidClient;
pub use exchange::{DEFAULT_SLIPPAGE, Exchange};
pub use info::{InfoRequest, OrderRef};
