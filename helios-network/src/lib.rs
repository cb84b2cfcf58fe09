//! Helios Network Library
//!
//! This library provides virtual IP management for load balancer endpoints:
//! - Address range parsing (`a.b.c.d` or `start-end`, IPv4 and IPv6)
//! - Sequential allocation and release from a range
//! - A network manager that reports allocation status to a metrics sink

pub mod error;
pub mod ip_allocator;
pub mod manager;
pub mod range;

pub use error::NetworkError;
pub use ip_allocator::IpAllocator;
pub use manager::NetworkManager;
pub use range::IpRange;
