#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use pods_ingress_core as core;
pub use pods_ingress_k8s_index as index;
pub use pods_ingress_nginx as nginx;

mod args;

pub use self::args::Args;
