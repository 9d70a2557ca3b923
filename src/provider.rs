//! Upstream identity provider descriptors.
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) naming the cached API, its
//! HTTPS token endpoint, and how client credentials are presented to it.

pub mod descriptor;

pub use descriptor::*;
