//! Host Interface
//!
//! Defines the trait that bridges the policy runtime (which is pure) and the
//! objects a host program injects into it, such as the `Host` and `Guests`
//! entities of the memory manager.

use crate::runtime::error::RuntimeResult;
use crate::runtime::values::Value;

/// An opaque object owned by the embedding program.
///
/// Policies reach it through dotted symbols: `Host.mem_free` reads an
/// attribute and `(Host.Stat "mem_free")` calls a method.
pub trait HostObject: std::fmt::Debug + Send + Sync {
    /// Short name used in error messages and when the object is printed.
    fn type_name(&self) -> &str;

    /// Returns the attribute `name`, or `None` when the object has no such
    /// attribute.
    fn attribute(&self, name: &str) -> Option<Value>;

    /// Invokes method `name` with already evaluated arguments.
    fn call_method(&self, name: &str, args: Vec<Value>) -> RuntimeResult<Value>;
}
