//! Per-resolution frames and cycle detection.

use std::fmt;
use std::sync::Arc;

use super::InjectionState;
use crate::error::{DiError, DiResult};
use crate::key::{Target, TypeInfo};

const MAX_DEPTH: usize = 1024;

/// One frame of a resolution: the target being resolved, the state it is
/// resolved in, and the frame that requested it.
///
/// Creating a frame walks its ancestors and fails with
/// [`DiError::Cyclic`] when the target is already being resolved.
pub(crate) struct InjectionContext<'a> {
    target: Target,
    state: Arc<InjectionState>,
    parent: Option<&'a InjectionContext<'a>>,
    depth: usize,
    current_class: Option<TypeInfo>,
    current_parameter: Option<&'static str>,
}

impl<'a> InjectionContext<'a> {
    /// Root frame of a lookup.
    pub(crate) fn new(target: Target, state: Arc<InjectionState>) -> Self {
        Self {
            target,
            state,
            parent: None,
            depth: 0,
            current_class: None,
            current_parameter: None,
        }
    }

    /// Frame resolving `target` on behalf of this one, in the same state.
    pub(crate) fn child<'b>(&'b self, target: Target) -> DiResult<InjectionContext<'b>> {
        if self.depth + 1 >= MAX_DEPTH {
            return Err(DiError::non_injectable(
                &target,
                format!("dependency chain deeper than {MAX_DEPTH}"),
            ));
        }
        let mut ancestor: Option<&InjectionContext<'_>> = Some(self);
        while let Some(frame) = ancestor {
            if frame.target == target {
                return Err(DiError::Cyclic(self.chain_to(&target)));
            }
            ancestor = frame.parent;
        }
        Ok(InjectionContext {
            target,
            state: self.state.clone(),
            parent: Some(self),
            depth: self.depth + 1,
            current_class: None,
            current_parameter: None,
        })
    }

    /// Same frame resolved in another state, for crossing into a private
    /// module. The ancestor chain is kept.
    pub(crate) fn with_state(&self, state: Arc<InjectionState>) -> InjectionContext<'a> {
        InjectionContext {
            target: self.target.clone(),
            state,
            parent: self.parent,
            depth: self.depth,
            current_class: self.current_class,
            current_parameter: self.current_parameter,
        }
    }

    /// Child frame for one constructor parameter of `class`.
    pub(crate) fn parameter<'b>(
        &'b self,
        target: Target,
        class: TypeInfo,
        parameter: &'static str,
    ) -> DiResult<InjectionContext<'b>> {
        let mut child = self.child(target)?;
        child.current_class = Some(class);
        child.current_parameter = Some(parameter);
        Ok(child)
    }

    pub(crate) fn target(&self) -> &Target {
        &self.target
    }

    pub(crate) fn state(&self) -> &Arc<InjectionState> {
        &self.state
    }

    pub(crate) fn current_class(&self) -> Option<TypeInfo> {
        self.current_class
    }

    pub(crate) fn current_parameter(&self) -> Option<&'static str> {
        self.current_parameter
    }

    /// Targets from the root frame down to `offending`.
    fn chain_to(&self, offending: &Target) -> Vec<String> {
        let mut chain = Vec::with_capacity(self.depth + 2);
        let mut frame: Option<&InjectionContext<'_>> = Some(self);
        while let Some(current) = frame {
            chain.push(current.target.to_string());
            frame = current.parent;
        }
        chain.reverse();
        chain.push(offending.to_string());
        chain
    }
}

impl fmt::Debug for InjectionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionContext")
            .field("target", &self.target.to_string())
            .field("depth", &self.depth)
            .field("class", &self.current_class)
            .field("parameter", &self.current_parameter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectorOptions;
    use crate::registration::BindingRegistry;

    fn state() -> Arc<InjectionState> {
        Arc::new(InjectionState::root(Arc::new(BindingRegistry::new()), InjectorOptions::default()))
    }

    struct A;
    struct B;

    #[test]
    fn revisiting_a_target_is_cyclic() {
        let root = InjectionContext::new(Target::of::<A>(), state());
        let b = root.child(Target::of::<B>()).unwrap();
        let err = b.child(Target::of::<A>()).unwrap_err();
        match err {
            DiError::Cyclic(chain) => {
                assert_eq!(chain.len(), 3);
                assert!(chain[0].ends_with("::A"));
                assert!(chain[1].ends_with("::B"));
                assert!(chain[2].ends_with("::A"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn same_type_with_other_name_is_not_a_cycle() {
        let root = InjectionContext::new(Target::of::<A>(), state());
        assert!(root.child(Target::named_of::<A>("other")).is_ok());
    }

    #[test]
    fn with_state_keeps_ancestors() {
        let root = InjectionContext::new(Target::of::<A>(), state());
        let b = root.child(Target::of::<B>()).unwrap();
        let moved = b.with_state(state());
        assert!(moved.child(Target::of::<A>()).is_err());
        assert_eq!(moved.target(), &Target::of::<B>());
    }

    #[test]
    fn parameter_frames_record_class_and_parameter() {
        let root = InjectionContext::new(Target::of::<A>(), state());
        let frame = root.parameter(Target::of::<B>(), TypeInfo::of::<A>(), "b").unwrap();
        assert_eq!(frame.current_class(), Some(TypeInfo::of::<A>()));
        assert_eq!(frame.current_parameter(), Some("b"));
    }
}
