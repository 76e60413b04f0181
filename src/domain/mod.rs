// Domain layer: session/credential models and ports. No HTTP or filesystem code here.

pub mod model;
pub mod ports;
