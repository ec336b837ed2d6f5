pub mod desk;
pub mod quote_cache;
pub mod session;
