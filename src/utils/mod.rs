pub mod rate_limiter;
pub mod utils;
pub mod validation;
