//! Request-level middleware: throttling and security headers

pub mod rate_limit;
pub mod security_headers;

pub use rate_limit::{rate_limit_middleware, Decision, RateLimiter, RatePolicy, RouteClass};
pub use security_headers::security_headers_middleware;
