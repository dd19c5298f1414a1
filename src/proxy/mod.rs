//! Proxy rotation
//!
//! Credentials are loaded once from a line-oriented file and drawn at random
//! for every request. When proxy mode is off the pool is simply empty.

mod credential;
mod pool;

pub use credential::{parse_proxy_line, parse_proxy_list, ProxyCredential};
pub use pool::ProxyPool;
