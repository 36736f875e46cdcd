mod client;
mod consumer;
mod demo_producer;
mod producer;
mod traits;

pub use client::*;
pub use consumer::*;
pub use demo_producer::*;
pub use producer::*;
pub use traits::*;
