//! # streamux-stages - Default transform stages
//!
//! Ready-made [`Transform`](streamux_core::Transform) implementations.
//! The reactor treats every stage as opaque; these exist so channels have
//! something useful to chain out of the box.
//!
//! | Stage          | Direction hint | State                         |
//! |----------------|----------------|-------------------------------|
//! | `Rot13`        | either         | none                          |
//! | `Base64Encode` | write          | up to 2 bytes of a triple     |
//! | `Base64Decode` | read           | up to 3 symbols of a quad     |

pub mod rot13;
pub mod base64;

pub use rot13::Rot13;
pub use self::base64::{Base64Decode, Base64Encode};
