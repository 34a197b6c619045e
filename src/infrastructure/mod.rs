pub mod http;
pub mod rate_limiter;
pub mod retry;

pub use http::{build_http_client, ensure_success};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
