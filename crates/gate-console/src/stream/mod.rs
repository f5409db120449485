mod backoff;
mod client;

pub(crate) use client::{ConnectionState, StreamClient, StreamConfig, StreamEvent};
