#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod config;
mod model;
mod route;
mod target;

pub use self::{
    config::Config,
    model::{upstream_name, Backend, Host, Location, RoutingModel, Server, Upstream},
    route::{Incoming, Outgoing, Route},
    target::Target,
};
