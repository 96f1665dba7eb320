pub mod application;
pub mod letter;
