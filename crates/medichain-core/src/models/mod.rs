//! Domain models for the medichain request store.

mod request;

pub use request::*;
