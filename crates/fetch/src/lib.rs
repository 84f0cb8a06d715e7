pub mod client;
pub mod feed;
pub mod pages;
pub mod session;

pub use client::{FetchMetrics, RemoteClient};
pub use session::SessionJar;
