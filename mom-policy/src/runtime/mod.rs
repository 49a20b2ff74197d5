//! Policy runtime
//!
//! Evaluates parsed expressions against a scope stack. Host programs inject
//! their own objects through [`HostObject`].

pub mod environment;
pub mod error;
pub mod evaluator;
pub mod host_interface;
pub mod param_binding;
pub mod stdlib;
pub mod values;

pub use environment::VariableStack;
pub use error::{RuntimeError, RuntimeResult};
pub use evaluator::{Evaluator, MAX_CALL_DEPTH, MAX_EVAL_DEPTH};
pub use host_interface::HostObject;
pub use param_binding::{Arg, ArgMode, Signature};
pub use values::{UserFunction, Value};
