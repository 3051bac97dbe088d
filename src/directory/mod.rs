//! User directory: registration, lookup, and the archive lifecycle.

pub mod users;

pub use users::configure;
