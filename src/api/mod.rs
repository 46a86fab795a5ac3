//! Public entry points: the HTTP router and the request limiter in front of it.

pub mod http;
pub mod ratelimit;

pub use http::{build_app, create_router, AppState, RouteLimits};
pub use ratelimit::{RateLimiter, Rejection};
