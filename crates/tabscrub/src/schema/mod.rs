//! Schema enforcement: required-column selection and type coercion.

mod converters;
mod enforcer;

pub use enforcer::SchemaEnforcer;
