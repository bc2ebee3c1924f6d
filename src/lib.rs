//! Local static asset server with SPA fallback routing.
//!
//! Maps request paths to files under a fixed serve root, enforcing
//! traversal confinement, resolving directory index documents, and falling
//! back to the root index for client-side-routed paths.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
