//! Adapters - Concrete implementations of ports.

pub mod aws;
pub mod ytdlp;

pub use aws::S3Adapter;
pub use ytdlp::YoutubeDl;
