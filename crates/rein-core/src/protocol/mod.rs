//! Control-channel protocol: message types and frame codec.

pub mod codec;
pub mod messages;
