//! screen-stream: live screen mirror over HTTP
//!
//! A [`producer::FrameProducer`] captures the primary display on a fixed
//! period, encodes it and publishes it into a shared
//! [`frame_buffer::FrameBuffer`]. The [`server`] streams the latest frame to
//! every connected browser as a `multipart/x-mixed-replace` response.

pub mod capture;
pub mod config;
pub mod error;
pub mod frame_buffer;
pub mod model;
pub mod producer;
pub mod server;
pub mod util;
