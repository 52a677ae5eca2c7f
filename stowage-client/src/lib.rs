pub mod bootstrap;
pub mod program;

pub use bootstrap::{start, BootstrapError, BootstrapResult, Session};
pub use program::Program;
