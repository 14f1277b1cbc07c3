pub mod constraints;
pub mod decision;
pub mod deferral;
pub mod engine;
pub mod types;
