//! Member metadata capability.
//!
//! The analyzer never inspects concrete plugin types. Anything that takes
//! part in resource analysis implements [`Reflect`] and reports its members:
//! a descriptor (declaring type, member name, open behavior) plus the current
//! value, if the member is readable. How the table is produced (by hand, a
//! derive, a registry) is up to the plugin.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::resource::ResourceHandle;

// ---------------------------------------------------------------------------
// OpenBehavior
// ---------------------------------------------------------------------------

/// How a referenced resource must be opened relative to its referencer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OpenBehavior {
    /// The referenced resource must be open before the referencer (strong edge).
    #[default]
    Before,
    /// The referenced resource may be opened concurrently (weak edge).
    InParallel,
    /// Not a dependency; the reference is informational only.
    Ignore,
}

impl OpenBehavior {
    /// `true` for [`OpenBehavior::Before`].
    #[must_use]
    pub fn is_strong(self) -> bool {
        self == Self::Before
    }

    /// `true` for [`OpenBehavior::Ignore`].
    #[must_use]
    pub fn is_ignored(self) -> bool {
        self == Self::Ignore
    }
}

impl fmt::Display for OpenBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "Before"),
            Self::InParallel => write!(f, "InParallel"),
            Self::Ignore => write!(f, "Ignore"),
        }
    }
}

// ---------------------------------------------------------------------------
// MemberDescriptor
// ---------------------------------------------------------------------------

/// Type-level description of a member.
///
/// Two descriptors are equal when they name the same member of the same
/// declaring type; the open behavior is an annotation on that member and
/// does not take part in identity.
#[derive(Clone)]
pub struct MemberDescriptor {
    declaring_type: Arc<str>,
    name: Arc<str>,
    open: OpenBehavior,
}

impl MemberDescriptor {
    /// Describe `declaring_type.name` with the default [`OpenBehavior::Before`].
    pub fn new(declaring_type: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            open: OpenBehavior::default(),
        }
    }

    /// Attach an open-behavior annotation.
    pub fn with_open(mut self, open: OpenBehavior) -> Self {
        self.open = open;
        self
    }

    /// Name of the type declaring this member.
    #[must_use]
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Member name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open behavior annotated on this member.
    #[must_use]
    pub fn open(&self) -> OpenBehavior {
        self.open
    }
}

impl PartialEq for MemberDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type && self.name == other.name
    }
}

impl Eq for MemberDescriptor {}

impl Hash for MemberDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("member", &format_args!("{self}"))
            .field("open", &self.open)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Member / MemberValue
// ---------------------------------------------------------------------------

/// Current value of a member.
#[derive(Debug, Clone)]
pub enum MemberValue {
    /// A resource-typed slot. `None` means the slot is intended but unset.
    Resource(Option<ResourceHandle>),
    /// A list of resource-typed slots.
    Resources(Vec<Option<ResourceHandle>>),
    /// Any value that is not resource-shaped.
    Other,
}

/// A member as reported by [`Reflect::members`].
#[derive(Debug, Clone)]
pub struct Member {
    /// Type-level description.
    pub descriptor: MemberDescriptor,
    /// Current value, or `None` if the member cannot be read.
    pub value: Option<MemberValue>,
}

impl Member {
    /// A readable single resource slot.
    pub fn resource(descriptor: MemberDescriptor, value: Option<ResourceHandle>) -> Self {
        Self {
            descriptor,
            value: Some(MemberValue::Resource(value)),
        }
    }

    /// A readable list of resource slots.
    pub fn resources(descriptor: MemberDescriptor, values: Vec<Option<ResourceHandle>>) -> Self {
        Self {
            descriptor,
            value: Some(MemberValue::Resources(values)),
        }
    }

    /// A readable member that does not hold resources.
    pub fn other(descriptor: MemberDescriptor) -> Self {
        Self {
            descriptor,
            value: Some(MemberValue::Other),
        }
    }

    /// A member whose value cannot be read (e.g. a write-only setting).
    pub fn unreadable(descriptor: MemberDescriptor) -> Self {
        Self {
            descriptor,
            value: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reflect
// ---------------------------------------------------------------------------

/// Member enumeration capability for plugin objects.
pub trait Reflect: Send + Sync {
    /// Name of the concrete type, used in member descriptors and logs.
    fn type_name(&self) -> &str;

    /// Snapshot of the object's members and their current values.
    fn members(&self) -> Vec<Member>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_behavior_is_before() {
        assert_eq!(OpenBehavior::default(), OpenBehavior::Before);
        assert!(OpenBehavior::Before.is_strong());
        assert!(!OpenBehavior::InParallel.is_strong());
        assert!(OpenBehavior::Ignore.is_ignored());
    }

    #[test]
    fn descriptor_identity_ignores_annotation() {
        let a = MemberDescriptor::new("PowerStep", "Supply");
        let b = MemberDescriptor::new("PowerStep", "Supply").with_open(OpenBehavior::InParallel);
        let c = MemberDescriptor::new("PowerStep", "Load");

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn descriptor_display_is_qualified() {
        let d = MemberDescriptor::new("PowerStep", "Supply");
        assert_eq!(d.to_string(), "PowerStep.Supply");
        assert_eq!(d.declaring_type(), "PowerStep");
        assert_eq!(d.name(), "Supply");
    }
}
