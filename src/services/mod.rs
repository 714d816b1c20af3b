pub mod expiry;
pub mod pages;
pub mod rate_limit;
