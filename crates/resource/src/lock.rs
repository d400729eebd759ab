//! Lock-manager hooks around opening and closing a test plan's resources.
//!
//! Hooks see the full node collection of an analysis pass before any
//! resource is opened and after all of them are closed (e.g. to take and
//! release an external bench lock). They run in descending priority order
//! for `before_open` and in the reverse order for `after_close`.
//!
//! A failing hook aborts the sequence: its error is returned to the caller
//! unchanged and the remaining hooks are not run.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::LockConfig;
use crate::error::{Error, Result};
use crate::graph::ResourceNode;

// ---------------------------------------------------------------------------
// LockHook trait
// ---------------------------------------------------------------------------

/// A callback pair run around the resource open/close sequence.
///
/// Long-running hooks should observe the cancellation token.
pub trait LockHook: Send + Sync {
    /// Human-readable name for this hook.
    fn name(&self) -> &str;

    /// Priority (higher = runs earlier on open, later on close). Default: 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Called before any resource is opened.
    fn before_open<'a>(
        &'a self,
        resources: &'a [ResourceNode],
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    /// Called after every resource has been closed.
    fn after_close<'a>(
        &'a self,
        resources: &'a [ResourceNode],
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    BeforeOpen,
    AfterClose,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Self::BeforeOpen => "before_open",
            Self::AfterClose => "after_close",
        }
    }
}

// ---------------------------------------------------------------------------
// LockManager
// ---------------------------------------------------------------------------

/// Ordered hook dispatcher.
///
/// The hook list is fixed at construction and sorted once by descending
/// priority; hooks with equal priority keep their registration order.
pub struct LockManager {
    hooks: Vec<Arc<dyn LockHook>>,
    config: LockConfig,
}

impl LockManager {
    /// Create a dispatcher over `hooks` with default settings.
    #[must_use]
    pub fn new(hooks: Vec<Arc<dyn LockHook>>) -> Self {
        Self::with_config(hooks, LockConfig::default())
    }

    /// Create a dispatcher over `hooks` with explicit settings.
    #[must_use]
    pub fn with_config(mut hooks: Vec<Arc<dyn LockHook>>, config: LockConfig) -> Self {
        sort_hooks(&mut hooks);
        Self { hooks, config }
    }

    /// Add a hook, keeping the priority order.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn LockHook>) -> Self {
        self.hooks.push(hook);
        sort_hooks(&mut self.hooks);
        self
    }

    /// Hook names in `before_open` order.
    #[must_use]
    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// `true` if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook's `before_open`, highest priority first.
    pub async fn before_open(
        &self,
        resources: &[ResourceNode],
        cancel: &CancellationToken,
    ) -> Result<()> {
        for hook in &self.hooks {
            self.invoke(hook.as_ref(), Phase::BeforeOpen, resources, cancel)
                .await?;
        }
        Ok(())
    }

    /// Run every hook's `after_close`, in the reverse of the open order.
    pub async fn after_close(
        &self,
        resources: &[ResourceNode],
        cancel: &CancellationToken,
    ) -> Result<()> {
        for hook in self.hooks.iter().rev() {
            self.invoke(hook.as_ref(), Phase::AfterClose, resources, cancel)
                .await?;
        }
        Ok(())
    }

    async fn invoke(
        &self,
        hook: &dyn LockHook,
        phase: Phase,
        resources: &[ResourceNode],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            tracing::warn!(
                hook = hook.name(),
                phase = phase.as_str(),
                "Lock hook dispatch cancelled"
            );
            return Err(Error::Cancelled {
                phase: phase.as_str(),
            });
        }

        tracing::debug!(
            hook = hook.name(),
            phase = phase.as_str(),
            resources = resources.len(),
            "Running lock hook"
        );

        let fut = match phase {
            Phase::BeforeOpen => hook.before_open(resources, cancel),
            Phase::AfterClose => hook.after_close(resources, cancel),
        };

        let result = match self.config.hook_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, fut).await {
                Ok(result) => result,
                Err(_) => Err(Error::HookTimeout {
                    hook: hook.name().to_string(),
                    phase: phase.as_str(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            },
            None => fut.await,
        };

        if let Err(err) = &result {
            tracing::error!(
                hook = hook.name(),
                phase = phase.as_str(),
                error = %err,
                "Lock hook failed"
            );
        }
        result
    }
}

fn sort_hooks(hooks: &mut [Arc<dyn LockHook>]) {
    hooks.sort_by_key(|h| std::cmp::Reverse(h.priority()));
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("hooks", &self.hook_names())
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in hooks
// ---------------------------------------------------------------------------

/// Audit hook that logs the resources about to open and just closed via
/// `tracing::info!`.
///
/// Priority `i32::MAX`: first on open, last on close.
pub struct AuditHook;

impl AuditHook {
    fn log(phase: Phase, resources: &[ResourceNode]) {
        for node in resources {
            tracing::info!(
                hook = "audit",
                phase = phase.as_str(),
                resource = %node.display_name(),
                strong = node.strong_dependencies().len(),
                weak = node.weak_dependencies().len(),
                references = node.references().len(),
                "Lock hook"
            );
        }
    }
}

impl LockHook for AuditHook {
    fn name(&self) -> &str {
        "audit"
    }

    fn priority(&self) -> i32 {
        i32::MAX
    }

    fn before_open<'a>(
        &'a self,
        resources: &'a [ResourceNode],
        _cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            Self::log(Phase::BeforeOpen, resources);
            Ok(())
        })
    }

    fn after_close<'a>(
        &'a self,
        resources: &'a [ResourceNode],
        _cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            Self::log(Phase::AfterClose, resources);
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
