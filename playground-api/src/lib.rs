//! Playground API - Wire and storage types shared by the playground client
//! and its front ends.

mod bundle;
mod event;
mod request;

pub use bundle::*;
pub use event::*;
pub use request::*;
