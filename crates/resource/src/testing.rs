//! Testing utilities for resource analysis and lock hooks.
//!
//! Compiled for this crate's own tests and with the `testing` feature.
//!
//! [`TestResource`] and [`TestStep`] implement the metadata capability with
//! hand-built member tables, so tests can wire arbitrary graphs (cycles
//! included). [`RecordingHook`] records every hook invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::graph::ResourceNode;
use crate::lock::LockHook;
use crate::member::{Member, MemberDescriptor, MemberValue, OpenBehavior, Reflect};
use crate::resource::{Resource, ResourceHandle};

// ---------------------------------------------------------------------------
// TestResource
// ---------------------------------------------------------------------------

/// Resource whose dependency members can be set after construction.
///
/// The resource name doubles as its type name, so a member `Bus` on
/// resource `PSU` is described as `PSU.Bus`.
pub struct TestResource {
    name: String,
    connected: AtomicBool,
    members: RwLock<Vec<(MemberDescriptor, MemberValue)>>,
}

impl TestResource {
    /// Create a closed resource with no members.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            connected: AtomicBool::new(false),
            members: RwLock::new(Vec::new()),
        })
    }

    /// Identity handle for this resource.
    pub fn handle(self: &Arc<Self>) -> ResourceHandle {
        ResourceHandle::from(Arc::clone(self))
    }

    /// Strong (`Before`) dependency through `member`.
    pub fn depends_on(&self, member: &str, target: &ResourceHandle) {
        self.set_dependency(member, Some(target.clone()), OpenBehavior::Before);
    }

    /// Set or replace a single-slot dependency member.
    pub fn set_dependency(&self, member: &str, target: Option<ResourceHandle>, open: OpenBehavior) {
        self.set(member, MemberValue::Resource(target), open);
    }

    /// Set or replace a list-of-resources dependency member.
    pub fn set_dependencies(
        &self,
        member: &str,
        targets: Vec<Option<ResourceHandle>>,
        open: OpenBehavior,
    ) {
        self.set(member, MemberValue::Resources(targets), open);
    }

    /// Mark the resource open or closed.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn set(&self, member: &str, value: MemberValue, open: OpenBehavior) {
        let descriptor = MemberDescriptor::new(self.name.as_str(), member).with_open(open);
        let mut members = self.members.write();
        if let Some(slot) = members.iter_mut().find(|(d, _)| *d == descriptor) {
            *slot = (descriptor, value);
        } else {
            members.push((descriptor, value));
        }
    }
}

impl Reflect for TestResource {
    fn type_name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> Vec<Member> {
        self.members
            .read()
            .iter()
            .map(|(descriptor, value)| Member {
                descriptor: descriptor.clone(),
                value: Some(value.clone()),
            })
            .collect()
    }
}

impl Resource for TestResource {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// TestStep
// ---------------------------------------------------------------------------

/// Plain plugin object (e.g. a test step) with a fixed member table.
#[derive(Debug, Clone)]
pub struct TestStep {
    type_name: String,
    members: Vec<Member>,
}

impl TestStep {
    /// Create a step of type `type_name` with no members.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            members: Vec::new(),
        }
    }

    fn descriptor(&self, name: &str, open: OpenBehavior) -> MemberDescriptor {
        MemberDescriptor::new(self.type_name.as_str(), name).with_open(open)
    }

    /// Add a `Before` resource member.
    pub fn with_resource(self, name: &str, value: Option<ResourceHandle>) -> Self {
        self.with_resource_open(name, value, OpenBehavior::Before)
    }

    /// Add a resource member with an explicit open behavior.
    pub fn with_resource_open(
        mut self,
        name: &str,
        value: Option<ResourceHandle>,
        open: OpenBehavior,
    ) -> Self {
        let descriptor = self.descriptor(name, open);
        self.members.push(Member::resource(descriptor, value));
        self
    }

    /// Add a `Before` list-of-resources member.
    pub fn with_resources(mut self, name: &str, values: Vec<Option<ResourceHandle>>) -> Self {
        let descriptor = self.descriptor(name, OpenBehavior::Before);
        self.members.push(Member::resources(descriptor, values));
        self
    }

    /// Add a member that does not hold resources.
    pub fn with_other(mut self, name: &str) -> Self {
        let descriptor = self.descriptor(name, OpenBehavior::Before);
        self.members.push(Member::other(descriptor));
        self
    }

    /// Add a member that cannot be read.
    pub fn with_unreadable(mut self, name: &str) -> Self {
        let descriptor = self.descriptor(name, OpenBehavior::Before);
        self.members.push(Member::unreadable(descriptor));
        self
    }
}

impl Reflect for TestStep {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn members(&self) -> Vec<Member> {
        self.members.clone()
    }
}

// ---------------------------------------------------------------------------
// RecordingHook
// ---------------------------------------------------------------------------

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCall {
    /// Hook name
    pub hook: String,
    /// `before_open` or `after_close`
    pub phase: &'static str,
    /// Number of nodes the hook was given
    pub resources: usize,
}

/// Log shared between recording hooks.
pub type HookLog = Arc<Mutex<Vec<HookCall>>>;

/// Lock hook that appends every invocation to a shared [`HookLog`].
pub struct RecordingHook {
    name: String,
    priority: i32,
    log: HookLog,
    delay: Option<Duration>,
    fail_on: Option<&'static str>,
}

impl RecordingHook {
    /// Fresh, empty log.
    pub fn shared_log() -> HookLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn build(name: &str, priority: i32, log: &HookLog) -> Self {
        Self {
            name: name.to_string(),
            priority,
            log: Arc::clone(log),
            delay: None,
            fail_on: None,
        }
    }

    /// Hook that records and succeeds.
    pub fn new(name: &str, priority: i32, log: &HookLog) -> Arc<dyn LockHook> {
        Arc::new(Self::build(name, priority, log))
    }

    /// Hook that records, then sleeps for `delay` before succeeding.
    pub fn slow(name: &str, priority: i32, log: &HookLog, delay: Duration) -> Arc<dyn LockHook> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::build(name, priority, log)
        })
    }

    /// Hook that records, then fails during `phase`.
    pub fn failing(
        name: &str,
        priority: i32,
        log: &HookLog,
        phase: &'static str,
    ) -> Arc<dyn LockHook> {
        Arc::new(Self {
            fail_on: Some(phase),
            ..Self::build(name, priority, log)
        })
    }

    /// `"phase:hook"` for every recorded call, in order.
    pub fn calls(log: &HookLog) -> Vec<String> {
        log.lock()
            .iter()
            .map(|call| format!("{}:{}", call.phase, call.hook))
            .collect()
    }

    async fn record(&self, phase: &'static str, resources: usize) -> Result<()> {
        self.log.lock().push(HookCall {
            hook: self.name.clone(),
            phase,
            resources,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on == Some(phase) {
            return Err(Error::hook(&self.name, phase, "refused by test hook"));
        }
        Ok(())
    }
}

impl LockHook for RecordingHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn before_open<'a>(
        &'a self,
        resources: &'a [ResourceNode],
        _cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.record("before_open", resources.len()))
    }

    fn after_close<'a>(
        &'a self,
        resources: &'a [ResourceNode],
        _cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.record("after_close", resources.len()))
    }
}
