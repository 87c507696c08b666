//! Effectful parts of the client: the transport seam, the configuration
//! context, timing, the request builder and the response chain.

pub mod chain;
pub mod config;
pub mod fetch;
pub mod perf;
pub mod wretcher;

pub use chain::ResponseChain;
pub use config::{Config, Constructor, Polyfills};
pub use fetch::{Fetch, abortable_body};
#[cfg(feature = "reqwest")]
pub use fetch::ReqwestFetch;
pub use perf::{PerfCallback, Performance, PerformanceEntry, Timed, Timeline};
pub use wretcher::{Resolver, Wretcher, wretch};
