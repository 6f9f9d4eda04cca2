//! Named uniform bindings.
//!
//! A uniform is either set once from a constant or re-evaluated every frame
//! from a producer. All arities and kinds share one dispatch path through
//! [`UniformValue`].

mod registry;
mod value;

pub use registry::{UniformBinding, UniformRegistry, UniformSource};
pub(crate) use registry::set_named;
pub use value::{UniformData, UniformKind, UniformType, UniformValue};
