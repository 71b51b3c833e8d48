//! The operation hook pipeline.
//!
//! Every user-facing operation runs inside the pipeline: pre-hooks, the
//! operation body exactly once, then post-hooks on success or error-hooks on
//! failure. Hooks are synchronous, named, and run in registration order;
//! registering an existing name replaces that hook in place.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::ide::Ide;

/// Shared context threaded through a single operation invocation.
///
/// `params` carries the operation inputs verbatim; the body records outputs
/// in `results` (e.g. the created worktree path) for post-hooks to act on.
pub struct HookContext {
    pub operation: String,
    pub params: IndexMap<String, String>,
    pub results: IndexMap<String, String>,
    /// Set while error-hooks run; an error-hook may replace it to translate
    /// the surfaced error.
    pub error: Option<Error>,
}

impl HookContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: IndexMap::new(),
            results: IndexMap::new(),
            error: None,
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

pub trait Hook: Send + Sync {
    fn name(&self) -> &str;

    fn pre(&self, _ctx: &mut HookContext) -> Result<()> {
        Ok(())
    }

    fn post(&self, _ctx: &mut HookContext) -> Result<()> {
        Ok(())
    }

    /// Runs after a failed pre-hook or body. May replace `ctx.error`;
    /// anything else it does cannot suppress the original error.
    fn on_error(&self, _ctx: &mut HookContext) {}
}

#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<Box<dyn Hook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook. A hook with the same name is replaced in place so
    /// its position in the order is kept.
    pub fn register(&mut self, hook: Box<dyn Hook>) {
        if let Some(slot) = self.hooks.iter_mut().find(|h| h.name() == hook.name()) {
            *slot = hook;
        } else {
            self.hooks.push(hook);
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.name() != name);
        self.hooks.len() != before
    }

    /// Run `body` wrapped in the registered hooks.
    ///
    /// - A failing pre-hook prevents the body from running.
    /// - The body runs exactly once; a panic inside it is captured and
    ///   converted to `PanicInOperation`.
    /// - On success, post-hooks run in order and the first failure is
    ///   returned.
    /// - On failure, error-hooks run in order for observability; the
    ///   original error is returned unless a hook replaced `ctx.error`.
    pub fn run<T>(
        &self,
        ctx: &mut HookContext,
        body: impl FnOnce(&mut HookContext) -> Result<T>,
    ) -> Result<T> {
        for hook in &self.hooks {
            if let Err(e) = hook.pre(ctx) {
                return Err(self.dispatch_error(ctx, e));
            }
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| body(ctx)));
        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::PanicInOperation {
                operation: ctx.operation.clone(),
            }),
        };

        match result {
            Ok(value) => {
                for hook in &self.hooks {
                    hook.post(ctx)?;
                }
                Ok(value)
            }
            Err(e) => Err(self.dispatch_error(ctx, e)),
        }
    }

    fn dispatch_error(&self, ctx: &mut HookContext, error: Error) -> Error {
        ctx.error = Some(error);
        for hook in &self.hooks {
            hook.on_error(ctx);
        }
        ctx.error
            .take()
            .unwrap_or_else(|| Error::PanicInOperation {
                operation: ctx.operation.clone(),
            })
    }
}

/// Built-in hook logging operation start, success, and failure.
pub struct TraceHook;

impl Hook for TraceHook {
    fn name(&self) -> &str {
        "trace"
    }

    fn pre(&self, ctx: &mut HookContext) -> Result<()> {
        log::debug!("starting {}", ctx.operation);
        Ok(())
    }

    fn post(&self, ctx: &mut HookContext) -> Result<()> {
        log::debug!("finished {}", ctx.operation);
        Ok(())
    }

    fn on_error(&self, ctx: &mut HookContext) {
        if let Some(e) = &ctx.error {
            log::debug!("{} failed: {e}", ctx.operation);
        }
    }
}

/// Built-in post-hook opening the operation result in an IDE when the
/// invocation asked for one (`ide` param present).
///
/// Reads `workspace_file` from the results when set, falling back to `path`.
pub struct OpenIdeHook {
    ide: Arc<dyn Ide>,
    verbose: bool,
}

impl OpenIdeHook {
    pub fn new(ide: Arc<dyn Ide>, verbose: bool) -> Self {
        Self { ide, verbose }
    }
}

impl Hook for OpenIdeHook {
    fn name(&self) -> &str {
        "open-ide"
    }

    fn post(&self, ctx: &mut HookContext) -> Result<()> {
        let Some(ide_name) = ctx.params.get("ide") else {
            return Ok(());
        };
        let Some(target) = ctx.results.get("workspace_file").or_else(|| ctx.results.get("path"))
        else {
            return Ok(());
        };
        self.ide
            .open(ide_name, std::path::Path::new(target), self.verbose)
    }
}
