//! Host notifications raised while timelines play.
//!
//! Every hook has a no-op default so hosts only implement what they need.
//! [`RecordingObserver`] captures every notification as an
//! [`ObservedEvent`], which the CLI prints as a JSON trace and tests assert
//! against.

use std::fmt;

use serde::Serialize;

use crate::actions::EventKind;
use crate::instance::InstanceState;
use crate::movie_clip::MovieClipInstance;
use crate::types::{Depth, MOVIE_CLIP_CLASS_NAME};

/// Borrowed description of the movie clip that owns a display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentInfo<'a> {
    pub name: &'a str,
    pub class_name: &'a str,
}

impl<'a> ParentInfo<'a> {
    pub fn new(name: &'a str, class_name: &'a str) -> Self {
        Self { name, class_name }
    }
}

impl fmt::Display for ParentInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.name.is_empty(), self.class_name.is_empty()) {
            (false, _) => write!(f, "'{}'", self.name),
            (true, false) => write!(f, "<{}>", self.class_name),
            (true, true) => write!(f, "<{MOVIE_CLIP_CLASS_NAME}>"),
        }
    }
}

pub trait TimelineObserver {
    /// A movie clip with an exported class reached its first frame inside
    /// `parent`.
    fn on_add_to_parent(
        &mut self,
        _parent: ParentInfo<'_>,
        _child: &MovieClipInstance,
        _class_name: &str,
    ) {
    }

    /// An instance was deep-cloned; `to` is the fresh copy of `from`.
    fn on_clone(&mut self, _from: &InstanceState, _to: &InstanceState) {}

    /// A frame event fired on `instance`.
    fn dispatch_event(&mut self, _event: &str, _kind: EventKind, _instance: &MovieClipInstance) {}

    fn dispatch_enter_frame(&mut self, _instance: &MovieClipInstance) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TimelineObserver for NullObserver {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservedEvent {
    AddToParent {
        parent: String,
        child: String,
        class_name: String,
        depth: Option<Depth>,
    },
    Clone {
        from: String,
        to: String,
    },
    Event {
        instance: String,
        name: String,
        event_kind: EventKind,
        frame: i32,
    },
    EnterFrame {
        instance: String,
        frame: i32,
    },
}

/// Records every notification in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Vec<ObservedEvent>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ObservedEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ObservedEvent> {
        std::mem::take(&mut self.events)
    }

    /// Names of the frame events seen so far, in order.
    pub fn event_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ObservedEvent::Event { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn label(instance: &MovieClipInstance) -> String {
    ParentInfo::new(instance.state().name(), instance.class_name()).to_string()
}

impl TimelineObserver for RecordingObserver {
    fn on_add_to_parent(
        &mut self,
        parent: ParentInfo<'_>,
        child: &MovieClipInstance,
        class_name: &str,
    ) {
        self.events.push(ObservedEvent::AddToParent {
            parent: parent.to_string(),
            child: label(child),
            class_name: class_name.to_string(),
            depth: child.state().depth_in_parent(),
        });
    }

    fn on_clone(&mut self, from: &InstanceState, to: &InstanceState) {
        self.events.push(ObservedEvent::Clone {
            from: from.name().to_string(),
            to: to.name().to_string(),
        });
    }

    fn dispatch_event(&mut self, event: &str, kind: EventKind, instance: &MovieClipInstance) {
        self.events.push(ObservedEvent::Event {
            instance: label(instance),
            name: event.to_string(),
            event_kind: kind,
            frame: instance.current_frame(),
        });
    }

    fn dispatch_enter_frame(&mut self, instance: &MovieClipInstance) {
        self.events.push(ObservedEvent::EnterFrame {
            instance: label(instance),
            frame: instance.current_frame(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_info_display_prefers_name() {
        assert_eq!(ParentInfo::new("hud", "Hud").to_string(), "'hud'");
        assert_eq!(ParentInfo::new("", "Hud").to_string(), "<Hud>");
        assert_eq!(ParentInfo::new("", "").to_string(), "<MovieClip>");
    }

    #[test]
    fn observed_events_serialize_with_kind_tag() {
        let event = ObservedEvent::EnterFrame {
            instance: "'root'".to_string(),
            frame: 3,
        };
        let json = serde_json::to_value(&event).expect("serializes");
        assert_eq!(json["kind"], "enter_frame");
        assert_eq!(json["frame"], 3);
    }
}
