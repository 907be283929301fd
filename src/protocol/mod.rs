//! Request/response value types

pub mod messages;

pub use messages::{Request, Response, Role, Widget};
