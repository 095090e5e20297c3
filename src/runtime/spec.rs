//! # Process specification.
//!
//! [`ProcessSpec`] is what a parent hands to [`Context::spawn`](crate::Context::spawn):
//! a name, a factory building fresh state (used again on every restart), and
//! the supervision policy the parent applies to this child.
//!
//! # Example
//! ```rust
//! use coffeehouse::{Context, Directive, Fault, Process, ProcessSpec, SupervisionPolicy};
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl Process for Echo {
//!     type Msg = String;
//!     async fn handle(&mut self, _ctx: &mut Context<Self>, msg: String) -> Result<(), Fault> {
//!         println!("{msg}");
//!         Ok(())
//!     }
//! }
//!
//! let spec = ProcessSpec::new("echo", || Echo).with_policy(SupervisionPolicy::new(Directive::Stop));
//! assert_eq!(spec.name(), "echo");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::policies::SupervisionPolicy;

use super::process::Process;

/// How to build and supervise one process.
pub struct ProcessSpec<P: Process> {
    name: Arc<str>,
    factory: Arc<dyn Fn() -> P + Send + Sync>,
    policy: SupervisionPolicy,
}

impl<P: Process> Clone for ProcessSpec<P> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            factory: Arc::clone(&self.factory),
            policy: self.policy.clone(),
        }
    }
}

impl<P: Process> fmt::Debug for ProcessSpec<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessSpec")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<P: Process> ProcessSpec<P> {
    /// Creates a spec with the default policy (restart on every fault).
    pub fn new(name: impl Into<Arc<str>>, factory: impl Fn() -> P + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            factory: Arc::new(factory),
            policy: SupervisionPolicy::default(),
        }
    }

    /// Sets the supervision policy.
    pub fn with_policy(mut self, policy: SupervisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Supervision policy.
    pub fn policy(&self) -> &SupervisionPolicy {
        &self.policy
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn build(&self) -> P {
        (self.factory)()
    }
}
