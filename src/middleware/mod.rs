pub mod rate_limiting;
pub mod request_logging;
pub mod sanitization;

pub use rate_limiting::{rate_limit, RateLimitResult, RateLimiter};
pub use request_logging::{log_requests, RequestLogging, REQUEST_ID_HEADER};
pub use sanitization::{sanitize_params, strip_html};
