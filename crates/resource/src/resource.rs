//! Resource capability and identity handle.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::member::Reflect;

/// A pluggable instrument, DUT or result listener with an open/close
/// lifecycle.
///
/// Resources are themselves [`Reflect`] objects: a resource may reference
/// further resources through its own members, which is how transitive
/// dependencies are discovered.
pub trait Resource: Reflect {
    /// Display name used in diagnostics (e.g. "PSU1").
    fn name(&self) -> String;

    /// Whether the resource is currently open.
    fn is_connected(&self) -> bool {
        false
    }
}

/// Identity handle for a resource instance.
///
/// Equality and hashing are by pointer identity: two handles are equal only
/// if they point at the same resource object, regardless of name.
#[derive(Clone)]
pub struct ResourceHandle(Arc<dyn Resource>);

impl ResourceHandle {
    /// Wrap a shared resource.
    pub fn new(resource: Arc<dyn Resource>) -> Self {
        Self(resource)
    }

    /// Display name of the resource.
    #[must_use]
    pub fn name(&self) -> String {
        self.0.name()
    }

    /// Whether the resource is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.0.is_connected()
    }

    /// Borrow the underlying resource.
    #[must_use]
    pub fn resource(&self) -> &Arc<dyn Resource> {
        &self.0
    }

    /// The resource as a metadata object, for member traversal.
    #[must_use]
    pub fn as_reflect(&self) -> Arc<dyn Reflect> {
        self.0.clone()
    }

    /// `true` if both handles refer to the same resource object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl<R: Resource + 'static> From<Arc<R>> for ResourceHandle {
    fn from(resource: Arc<R>) -> Self {
        Self(resource)
    }
}

impl PartialEq for ResourceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ResourceHandle {}

impl Hash for ResourceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0).cast::<()>(), state);
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourceHandle").field(&self.name()).finish()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Member;
    use std::collections::HashSet;

    struct Named(&'static str);

    impl Reflect for Named {
        fn type_name(&self) -> &str {
            "Named"
        }

        fn members(&self) -> Vec<Member> {
            Vec::new()
        }
    }

    impl Resource for Named {
        fn name(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn identity_is_by_pointer_not_name() {
        let a = ResourceHandle::from(Arc::new(Named("DMM")));
        let b = ResourceHandle::from(Arc::new(Named("DMM")));
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_ne!(a, b);

        let set: HashSet<_> = [a, a2, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn debug_and_display_show_name() {
        let h = ResourceHandle::from(Arc::new(Named("PSU1")));
        assert_eq!(h.to_string(), "PSU1");
        assert_eq!(format!("{h:?}"), "ResourceHandle(\"PSU1\")");
        assert!(!h.is_connected());
        assert_eq!(h.as_reflect().type_name(), "Named");
    }
}
