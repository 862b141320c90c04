pub mod bhtree;
pub mod body;
pub mod engine;
pub mod quadrant;
pub mod scenario;
