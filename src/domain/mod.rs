// Domain layer: state model and ports. Only std/serde types live here.

pub mod model;
pub mod ports;
