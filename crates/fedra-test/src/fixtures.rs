//! Fixtures - sleepers, object models and generators

use std::sync::Arc;
use std::time::Duration;

use fedra_core::{InteractionClass, Sharing};
use fedra_runtime::Sleeper;
use parking_lot::Mutex;
use proptest::prelude::*;

/// Records join retry delays instead of sleeping
///
/// Clones share the same record, so a test can keep one handle while the
/// federate owns the other.
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sleeps.lock().len()
    }

    /// Total time that would have been slept
    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

const SHARING_CYCLE: [Option<Sharing>; 5] = [
    Some(Sharing::Publish),
    Some(Sharing::Subscribe),
    Some(Sharing::PublishSubscribe),
    Some(Sharing::Neither),
    None,
];

/// A full tree of `depth` levels below the root, `fanout` children per node
///
/// Sharing cycles through every variant (and absent) in pre-order, so the
/// tree exercises each classification branch.
pub fn wide_class_tree(depth: usize, fanout: usize) -> InteractionClass {
    let mut counter = 0usize;
    let mut root = InteractionClass::root();
    root.children = build_level(depth, fanout, "", &mut counter);
    root
}

fn build_level(depth: usize, fanout: usize, prefix: &str, counter: &mut usize) -> Vec<InteractionClass> {
    if depth == 0 {
        return Vec::new();
    }
    (0..fanout)
        .map(|i| {
            let name = format!("{}C{}", prefix, i);
            let mut class = InteractionClass::new(name.clone());
            class.sharing = SHARING_CYCLE[*counter % SHARING_CYCLE.len()];
            *counter += 1;
            class.children = build_level(depth - 1, fanout, &format!("{}_", name), counter);
            class
        })
        .collect()
}

/// A small federation object model
///
/// ```text
/// HLAinteractionRoot
/// ├── Lifecycle            (Neither)
/// │   ├── Start            (Publish)
/// │   └── Stop             (Subscribe)
/// ├── Telemetry            (PublishSubscribe)
/// │   └── Position         (Publish)
/// └── Command              (absent)
///     └── Waypoint         (PublishSubscribe)
/// ```
pub fn sample_object_model() -> InteractionClass {
    InteractionClass::root().with_children([
        InteractionClass::new("Lifecycle")
            .with_sharing(Sharing::Neither)
            .with_child(InteractionClass::new("Start").with_sharing(Sharing::Publish))
            .with_child(InteractionClass::new("Stop").with_sharing(Sharing::Subscribe)),
        InteractionClass::new("Telemetry")
            .with_sharing(Sharing::PublishSubscribe)
            .with_child(InteractionClass::new("Position").with_sharing(Sharing::Publish)),
        InteractionClass::new("Command")
            .with_child(InteractionClass::new("Waypoint").with_sharing(Sharing::PublishSubscribe)),
    ])
}

/// Any sharing, including absent
pub fn arb_sharing() -> impl Strategy<Value = Option<Sharing>> {
    prop_oneof![
        Just(None),
        Just(Some(Sharing::Publish)),
        Just(Some(Sharing::Subscribe)),
        Just(Some(Sharing::PublishSubscribe)),
        Just(Some(Sharing::Neither)),
    ]
}

/// Arbitrary interaction-class trees up to a few levels deep
pub fn arb_class_tree() -> impl Strategy<Value = InteractionClass> {
    let leaf = ("[A-Z][a-z]{0,6}", arb_sharing()).prop_map(|(name, sharing)| {
        let mut class = InteractionClass::new(name);
        class.sharing = sharing;
        class
    });
    leaf.prop_recursive(4, 64, 6, |inner| {
        ("[A-Z][a-z]{0,6}", arb_sharing(), prop::collection::vec(inner, 0..6)).prop_map(
            |(name, sharing, children)| {
                let mut class = InteractionClass::new(name);
                class.sharing = sharing;
                class.children = children;
                class
            },
        )
    })
}
