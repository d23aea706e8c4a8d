pub mod discover;
pub mod open;
pub mod probe;
