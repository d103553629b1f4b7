use crate::path::{Key, KeyPath};

/// One resolution step taken while building a tree.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    Constructed { path: KeyPath, constructor: String },
    Resolved {
        path: KeyPath,
        module: String,
        method: String,
    },
    Chose { path: KeyPath, choice: Key },
}

/// Ordered record of what a build resolved, for callers that want diagnostics
/// without touching global logger state.
#[derive(Clone, Debug, Default)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Names of invoked constructors, in invocation order.
    pub fn constructors(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            TraceEvent::Constructed { constructor, .. } => Some(constructor.as_str()),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
