pub mod migrate;
pub mod stories;
pub mod token;
pub mod user;
