//! Call context and the same-signing-key trust bypass.
//!
//! The host passes a [`CallContext`] describing who is asking: the entry
//! component of the process and the chain of callers, nearest first.
//! A component whose license cannot be resolved is still usable when the
//! entry component or one of its callers was signed with the same
//! strong-name key.

use crate::component::{ComponentId, ComponentInfo};
use std::sync::Arc;

/// Who is asking for a license.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    entry: Option<Arc<ComponentInfo>>,
    callers: Vec<Arc<ComponentInfo>>,
    design_mode: bool,
}

impl CallContext {
    /// Empty context: no entry component, no callers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the process entry component.
    pub fn with_entry(mut self, entry: impl Into<Arc<ComponentInfo>>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    /// Append a caller. Callers are ordered nearest first.
    pub fn with_caller(mut self, caller: impl Into<Arc<ComponentInfo>>) -> Self {
        self.callers.push(caller.into());
        self
    }

    /// Ask for a design-time license instead of a runtime one.
    pub fn design_time(mut self) -> Self {
        self.design_mode = true;
        self
    }

    /// Whether design-time providers are consulted.
    pub fn is_design_time(&self) -> bool {
        self.design_mode
    }

    /// Entry component.
    pub fn entry(&self) -> Option<&ComponentInfo> {
        self.entry.as_deref()
    }

    /// Callers, nearest first.
    pub fn callers(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.callers.iter().map(|c| c.as_ref())
    }

    /// Callers other than `component`, nearest first.
    pub fn callers_excluding(
        &self,
        component: ComponentId,
    ) -> impl Iterator<Item = &ComponentInfo> + '_ {
        self.callers().filter(move |c| c.id() != component)
    }
}

/// Find the first component in `context` signed with the same key as
/// `component`: the entry component first, then the callers.
///
/// Unsigned components never match.
pub fn same_key_caller<'a>(
    component: &ComponentInfo,
    context: &'a CallContext,
) -> Option<&'a ComponentInfo> {
    let token = component.public_key_token();
    if token.is_empty() {
        return None;
    }

    let id = component.id();
    let matches = |candidate: &&ComponentInfo| {
        candidate.id() != id && candidate.public_key_token() == token
    };

    context
        .entry()
        .into_iter()
        .find(|c| matches(c))
        .or_else(|| context.callers().find(|c| matches(c)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Version;

    const VENDOR_PUB: &[u8] = include_bytes!("../../tests/fixtures/vendor.pub");
    const OTHER_PUB: &[u8] = include_bytes!("../../tests/fixtures/other.pub");

    fn signed(name: &str, blob: &[u8]) -> ComponentInfo {
        ComponentInfo::new(name, Version::new(1, 0, 0, 0))
            .with_strong_name(blob)
            .unwrap()
    }

    fn unsigned(name: &str) -> ComponentInfo {
        ComponentInfo::new(name, Version::new(1, 0, 0, 0))
    }

    #[test]
    fn test_same_key_entry_matches() {
        let grid = signed("Acme.Grid", VENDOR_PUB);
        let context = CallContext::new().with_entry(signed("Acme.App", VENDOR_PUB));
        assert_eq!(same_key_caller(&grid, &context).unwrap().name(), "Acme.App");
    }

    #[test]
    fn test_same_key_caller_matches() {
        let grid = signed("Acme.Grid", VENDOR_PUB);
        let context = CallContext::new()
            .with_entry(unsigned("Host"))
            .with_caller(signed("ThirdParty", OTHER_PUB))
            .with_caller(signed("Acme.Charts", VENDOR_PUB));
        assert_eq!(same_key_caller(&grid, &context).unwrap().name(), "Acme.Charts");
    }

    #[test]
    fn test_component_itself_is_skipped() {
        let grid = signed("Acme.Grid", VENDOR_PUB);
        let context = CallContext::new()
            .with_entry(grid.clone())
            .with_caller(grid.clone());
        assert!(same_key_caller(&grid, &context).is_none());
    }

    #[test]
    fn test_different_key_does_not_match() {
        let grid = signed("Acme.Grid", VENDOR_PUB);
        let context = CallContext::new()
            .with_entry(signed("Other.App", OTHER_PUB))
            .with_caller(unsigned("Script"));
        assert!(same_key_caller(&grid, &context).is_none());
    }

    #[test]
    fn test_unsigned_component_never_matches() {
        let tool = unsigned("Tool");
        let context = CallContext::new()
            .with_entry(unsigned("Host"))
            .with_caller(unsigned("Other"));
        assert!(same_key_caller(&tool, &context).is_none());
    }

    #[test]
    fn test_callers_excluding() {
        let grid = signed("Acme.Grid", VENDOR_PUB);
        let context = CallContext::new()
            .with_caller(grid.clone())
            .with_caller(unsigned("Host"));
        let names: Vec<_> = context.callers_excluding(grid.id()).map(|c| c.name()).collect();
        assert_eq!(names, vec!["Host"]);
    }
}
