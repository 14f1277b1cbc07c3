pub mod fallback;
pub mod probe;
pub mod types;
