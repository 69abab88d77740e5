//! Policy chains
//!
//! A policy is one named precondition. Operations assemble the policies that
//! apply to them into a [`PolicyChain`], which evaluates them in insertion
//! order and stops at the first one that fails.

use crate::{ExhaustionBook, Timestamp, World};
use std::fmt;

/// Read-only state a policy may consult
pub struct PolicyContext<'a> {
    pub world: &'a dyn World,
    pub exhaustion: &'a ExhaustionBook,
    pub now: Timestamp,
}

impl<'a> PolicyContext<'a> {
    pub fn new(world: &'a dyn World, exhaustion: &'a ExhaustionBook, now: Timestamp) -> Self {
        Self {
            world,
            exhaustion,
            now,
        }
    }
}

/// A single named precondition
///
/// Implementations must not mutate anything; they close over the actors and
/// locations of the operation that built them.
pub trait Policy: Send {
    /// Stable name, used in logs and tests
    fn name(&self) -> &'static str;

    /// Whether the precondition holds
    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool;

    /// Message shown to the requestor when the precondition fails
    fn message(&self) -> &str {
        "Sorry, not possible."
    }
}

/// The first policy that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    pub policy: &'static str,
    pub message: String,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.policy, self.message)
    }
}

/// Policy backed by a closure
pub struct FnPolicy<F> {
    name: &'static str,
    message: String,
    check: F,
}

impl<F> FnPolicy<F> {
    pub fn new(name: &'static str, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&PolicyContext<'_>) -> bool + Send,
    {
        Self {
            name,
            message: message.into(),
            check,
        }
    }
}

impl<F> Policy for FnPolicy<F>
where
    F: Fn(&PolicyContext<'_>) -> bool + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn evaluate(&self, ctx: &PolicyContext<'_>) -> bool {
        (self.check)(ctx)
    }

    fn message(&self) -> &str {
        &self.message
    }
}

/// Ordered list of policies
#[derive(Default)]
pub struct PolicyChain {
    policies: Vec<Box<dyn Policy>>,
}

impl PolicyChain {
    /// Create an empty chain (always passes)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy
    pub fn push(&mut self, policy: impl Policy + 'static) {
        self.policies.push(Box::new(policy));
    }

    /// Append a policy, builder style
    pub fn with(mut self, policy: impl Policy + 'static) -> Self {
        self.push(policy);
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policy names in evaluation order
    pub fn names(&self) -> Vec<&'static str> {
        self.policies.iter().map(|policy| policy.name()).collect()
    }

    /// Evaluate in order, stopping at the first failure
    pub fn evaluate(&self, ctx: &PolicyContext<'_>) -> Result<(), PolicyViolation> {
        match self.policies.iter().find(|policy| !policy.evaluate(ctx)) {
            Some(failed) => Err(PolicyViolation {
                policy: failed.name(),
                message: failed.message().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Like [`evaluate`](Self::evaluate), but `force` skips every policy
    pub fn can_be_performed(
        &self,
        ctx: &PolicyContext<'_>,
        force: bool,
    ) -> Result<(), PolicyViolation> {
        if force {
            return Ok(());
        }
        self.evaluate(ctx)
    }
}

impl fmt::Debug for PolicyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyChain")
            .field("policies", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryWorld;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Exploding;

    impl Policy for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn evaluate(&self, _ctx: &PolicyContext<'_>) -> bool {
            panic!("must never be evaluated");
        }
    }

    fn with_ctx<R>(f: impl FnOnce(&PolicyContext<'_>) -> R) -> R {
        let world = MemoryWorld::new();
        let exhaustion = ExhaustionBook::new();
        let ctx = PolicyContext::new(&world, &exhaustion, Timestamp::ZERO);
        f(&ctx)
    }

    #[test]
    fn test_short_circuits_on_first_failure() {
        let chain = PolicyChain::new()
            .with(FnPolicy::new("p1", "first failed", |_| false))
            .with(Exploding);

        let violation = with_ctx(|ctx| chain.evaluate(ctx)).unwrap_err();
        assert_eq!(violation.policy, "p1");
        assert_eq!(violation.message, "first failed");
    }

    #[test]
    fn test_evaluates_in_declaration_order() {
        let order = Arc::new(AtomicUsize::new(0));
        let first_seen = Arc::clone(&order);
        let second_seen = Arc::clone(&order);
        let chain = PolicyChain::new()
            .with(FnPolicy::new("first", "x", move |_| {
                first_seen.compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst).is_ok()
            }))
            .with(FnPolicy::new("second", "y", move |_| {
                second_seen.compare_exchange(1, 2, Ordering::SeqCst, Ordering::SeqCst).is_ok()
            }));

        assert!(with_ctx(|ctx| chain.evaluate(ctx)).is_ok());
        assert_eq!(order.load(Ordering::SeqCst), 2);
        assert_eq!(chain.names(), vec!["first", "second"]);
    }

    #[test]
    fn test_force_bypasses_policies() {
        let chain = PolicyChain::new().with(Exploding);
        assert!(with_ctx(|ctx| chain.can_be_performed(ctx, true)).is_ok());
    }

    #[test]
    fn test_empty_chain_passes() {
        let chain = PolicyChain::new();
        assert!(chain.is_empty());
        assert!(with_ctx(|ctx| chain.evaluate(ctx)).is_ok());
    }
}
