// NetBox REST API surface.
//
// `client` owns transport mechanics (auth header, URL joining, pagination,
// error envelopes). Endpoint groups are inherent methods in sibling files.

pub mod client;
pub mod dcim;
pub mod extras;
pub mod ipam;
pub mod models;

pub use client::NetBoxClient;
