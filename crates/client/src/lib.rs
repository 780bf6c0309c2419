//! Client side of encore.
//!
//! This crate provides the network layer and the background worker: lifecycle,
//! stale-while-revalidate fetch interception, pages and notifications.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchConfig, HttpNetwork, MemoryNetwork};

pub use worker::{
    HostEvent, Intercepted, PageMessage, ResponseSource, ServiceHost, Worker, WorkerConfig, WorkerId, WorkerState,
};
