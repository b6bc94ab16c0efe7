//! Pods Ingress route index
//!
//! Aggregates a snapshot of routable pods into the routing model that nginx
//! configuration is rendered from. The snapshot (a [`Cache`]) is produced by
//! the watch layer and holds:
//!
//! - Each routable `Pod`, with the host/path routes declared by its annotations.
//! - At most one API key `Secret` per namespace.
//!
//! Routes that share a host and path are merged. The first pod to claim a
//! path gets a direct location; as soon as a second pod with a different
//! address claims it, the location is promoted to a named upstream that
//! holds one member per distinct address.
//!
//! ```text
//! [ Pod ] -> [ Route ] -> [ Host ] -> [ Location ] -> ( Server | Upstream )
//!                                          ^
//!                     [ Secret ] ----------'
//! ```
//!
//! Aggregation is a pure function of the snapshot; nothing is retained
//! between calls.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod aggregate;
mod cache;


pub use self::{
    aggregate::aggregate,
    cache::{Cache, PodWithRoutes},
};
