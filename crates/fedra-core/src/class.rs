//! Interaction-class hierarchy and publish/subscribe classification
//!
//! The object model supplies a rooted tree of interaction classes. Each class
//! carries its own sharing attribute:
//! - Publish: this federate sends the interaction
//! - Subscribe: this federate receives the interaction
//! - PublishSubscribe: both
//! - Neither / unset: no interest, but children are still examined
//!
//! Sharing is node-local. A subscribed class says nothing about its children.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Name of the interaction-class root in every object model
pub const INTERACTION_ROOT: &str = "HLAinteractionRoot";

/// Sharing attribute of a class
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sharing {
    Publish,
    Subscribe,
    PublishSubscribe,
    Neither,
}

impl Sharing {
    /// Does this sharing put the class in the `mode` interest set?
    #[inline]
    pub fn matches(self, mode: InterestMode) -> bool {
        match (self, mode) {
            (Sharing::PublishSubscribe, _) => true,
            (Sharing::Publish, InterestMode::Publish) => true,
            (Sharing::Subscribe, InterestMode::Subscribe) => true,
            _ => false,
        }
    }
}

/// Which interest set is being requested
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InterestMode {
    Publish,
    Subscribe,
}

impl fmt::Display for InterestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestMode::Publish => f.write_str("publish"),
            InterestMode::Subscribe => f.write_str("subscribe"),
        }
    }
}

/// A node of the interaction-class tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionClass {
    pub name: String,
    #[serde(default)]
    pub sharing: Option<Sharing>,
    #[serde(default)]
    pub children: Vec<InteractionClass>,
}

impl InteractionClass {
    pub fn new(name: impl Into<String>) -> Self {
        InteractionClass {
            name: name.into(),
            sharing: None,
            children: Vec::new(),
        }
    }

    /// The conventional `HLAinteractionRoot` with no sharing
    pub fn root() -> Self {
        Self::new(INTERACTION_ROOT)
    }

    pub fn with_sharing(mut self, sharing: Sharing) -> Self {
        self.sharing = Some(sharing);
        self
    }

    pub fn with_child(mut self, child: InteractionClass) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = InteractionClass>) -> Self {
        self.children.extend(children);
        self
    }

    #[inline]
    pub fn matches(&self, mode: InterestMode) -> bool {
        self.sharing.is_some_and(|s| s.matches(mode))
    }

    pub fn child(&self, name: &str) -> Option<&InteractionClass> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Identity reference to a class inside a tree
///
/// Two refs are equal only if they point at the same node, so classes with
/// equal names in different branches stay distinct set members.
#[derive(Clone, Copy)]
pub struct ClassRef<'a>(&'a InteractionClass);

impl<'a> ClassRef<'a> {
    #[inline]
    pub fn get(self) -> &'a InteractionClass {
        self.0
    }
}

impl Deref for ClassRef<'_> {
    type Target = InteractionClass;

    fn deref(&self) -> &InteractionClass {
        self.0
    }
}

impl PartialEq for ClassRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for ClassRef<'_> {}

impl Hash for ClassRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0, state)
    }
}

impl fmt::Debug for ClassRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.0.name)
    }
}

/// Publish or subscribe interest set: membership only, no order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterestSet<'a> {
    members: HashSet<ClassRef<'a>>,
}

impl<'a> InterestSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, class: &'a InteractionClass) -> bool {
        self.members.insert(ClassRef(class))
    }

    pub fn contains(&self, class: &InteractionClass) -> bool {
        self.members.iter().any(|m| std::ptr::eq(m.0, class))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClassRef<'a>> + '_ {
        self.members.iter().copied()
    }

    /// Member names, sorted for stable output
    pub fn names(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self.members.iter().map(|m| m.get().name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn intersection(&self, other: &InterestSet<'a>) -> InterestSet<'a> {
        InterestSet {
            members: self.members.intersection(&other.members).copied().collect(),
        }
    }
}

/// Read-only index over an interaction-class tree
#[derive(Clone, Copy, Debug)]
pub struct ClassHierarchyIndex<'a> {
    root: &'a InteractionClass,
}

impl<'a> ClassHierarchyIndex<'a> {
    pub fn new(root: &'a InteractionClass) -> Self {
        ClassHierarchyIndex { root }
    }

    #[inline]
    pub fn root(&self) -> &'a InteractionClass {
        self.root
    }

    /// Classes whose sharing matches `mode` or is PublishSubscribe
    pub fn classify(&self, mode: InterestMode) -> InterestSet<'a> {
        self.classify_traced(mode, |_| {})
    }

    /// As [`classify`](Self::classify), calling `visit` once per node traversed
    pub fn classify_traced<F>(&self, mode: InterestMode, mut visit: F) -> InterestSet<'a>
    where
        F: FnMut(&'a InteractionClass),
    {
        let mut set = InterestSet::new();
        for class in self.iter() {
            visit(class);
            if class.matches(mode) {
                set.insert(class);
                trace!(class = %class.name, %mode, size = set.len(), "added interaction class");
            }
        }
        set
    }

    pub fn publish_set(&self) -> InterestSet<'a> {
        self.classify(InterestMode::Publish)
    }

    pub fn subscribe_set(&self) -> InterestSet<'a> {
        self.classify(InterestMode::Subscribe)
    }

    /// Depth-first pre-order walk of the whole tree
    pub fn iter(&self) -> PreOrder<'a> {
        PreOrder {
            stack: vec![self.root],
        }
    }

    /// Number of classes in the tree, root included
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Never true: a tree always has its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Resolve a dotted class name such as `HLAinteractionRoot.Order.Placed`
    ///
    /// The leading root segment is optional; `Order.Placed` finds the same class.
    pub fn find(&self, qualified_name: &str) -> Option<&'a InteractionClass> {
        let mut segments = qualified_name.split('.').filter(|s| !s.is_empty()).peekable();
        if segments.peek() == Some(&self.root.name.as_str()) {
            segments.next();
        }
        let mut node = self.root;
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }
}

/// Pre-order iterator with an explicit stack
pub struct PreOrder<'a> {
    stack: Vec<&'a InteractionClass>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a InteractionClass;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
