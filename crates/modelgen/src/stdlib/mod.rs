//! Static (built-in) modules: `base` and `math` (§4.5). Registered once
//! at [`crate::instance::Instance::new`] time and exempt from the
//! "never re-execute" rule since they have no source to run.

mod base;
mod math;

use indexmap::IndexMap;

use crate::value::Value;

/// The static modules an instance starts with, in registration order.
pub fn static_modules() -> Vec<(&'static str, IndexMap<String, Value>)> {
    vec![("base", base::globals()), ("math", math::globals())]
}
