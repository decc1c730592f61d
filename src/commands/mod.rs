// Command handlers module
pub mod candidates;
pub mod detect;
pub mod once;
pub mod port;
pub mod watch;
