pub mod push;
pub mod role;
pub mod schedule;
pub mod user;
