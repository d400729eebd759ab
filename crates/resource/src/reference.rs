//! Resource reference collection.

use std::fmt;
use std::sync::Arc;

use crate::member::{MemberDescriptor, MemberValue, OpenBehavior, Reflect};
use crate::resource::ResourceHandle;

/// "`instance` uses a resource through `member`".
///
/// Captured at analysis time; the resource value is whatever the member held
/// when it was read.
#[derive(Clone)]
pub struct ResourceReference {
    instance: Arc<dyn Reflect>,
    member: MemberDescriptor,
    resource: Option<ResourceHandle>,
}

impl ResourceReference {
    /// The referencing object (a test step, or another resource).
    #[must_use]
    pub fn instance(&self) -> &Arc<dyn Reflect> {
        &self.instance
    }

    /// The member through which the resource is referenced.
    #[must_use]
    pub fn member(&self) -> &MemberDescriptor {
        &self.member
    }

    /// The referenced resource; `None` for an unset slot.
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceHandle> {
        self.resource.as_ref()
    }

    /// Open behavior annotated on the member.
    #[must_use]
    pub fn behavior(&self) -> OpenBehavior {
        self.member.open()
    }
}

impl fmt::Debug for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceReference")
            .field("instance", &self.instance.type_name())
            .field("member", &format_args!("{}", self.member))
            .field("resource", &self.resource)
            .field("behavior", &self.behavior())
            .finish()
    }
}

/// Collect every resource reference held by `instance`.
///
/// Yields one reference per resource slot of each readable, resource-typed
/// member, unset slots included. Unreadable and non-resource members are
/// skipped. `Ignore` references are returned too; filtering them is the
/// consumer's decision.
pub fn collect_references(instance: &Arc<dyn Reflect>) -> Vec<ResourceReference> {
    let mut references = Vec::new();

    for member in instance.members() {
        let slots = match member.value {
            Some(MemberValue::Resource(slot)) => vec![slot],
            Some(MemberValue::Resources(slots)) => slots,
            Some(MemberValue::Other) | None => continue,
        };

        references.extend(slots.into_iter().map(|resource| ResourceReference {
            instance: Arc::clone(instance),
            member: member.descriptor.clone(),
            resource,
        }));
    }

    references
}
