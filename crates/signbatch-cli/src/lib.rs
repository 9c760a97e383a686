//! Signbatch CLI Library
//!
//! Presentation layer over the signing engine: argument parsing, password
//! prompting, and rendering of the dispatcher's event stream.

pub mod render;
pub mod sdk_cmd;
pub mod sign_cmd;
