// Library root: expected-points projection and transfer planning for a
// fantasy football squad. Re-exports all modules so integration tests and the
// command-line front end can reach the public API.

pub mod catalog;
pub mod chips;
pub mod config;
pub mod fixtures;
pub mod planner;
pub mod projection;
pub mod scorer;
pub mod source;
pub mod squad;
pub mod strength;
pub mod transfers;
