// Domain layer: contact and job models plus the ports the pipeline talks to.

pub mod model;
pub mod ports;
