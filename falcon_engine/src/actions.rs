//! Declarative per-frame actions: stop the playhead, toggle visibility and
//! fire named events at the host.

use std::collections::HashMap;

use falcon_formats::SimpleActionsDocument;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Delivered to the instance only.
    Dispatch,
    /// Delivered to the instance and then up its parent chain.
    Bubble,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub name: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameActions {
    pub stop: bool,
    /// `Some(value)` forces the instance's visibility when the frame is
    /// entered.
    pub visible: Option<bool>,
    pub events: Vec<FrameEvent>,
}

impl FrameActions {
    pub fn has_non_event_actions(&self) -> bool {
        self.stop || self.visible.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleActions {
    frames: HashMap<u16, FrameActions>,
}

impl SimpleActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(document: &SimpleActionsDocument) -> Self {
        let frames = document
            .frames
            .iter()
            .map(|(frame, actions)| {
                let events = actions
                    .events
                    .iter()
                    .map(|event| FrameEvent {
                        name: event.name.clone(),
                        kind: if event.bubble {
                            EventKind::Bubble
                        } else {
                            EventKind::Dispatch
                        },
                    })
                    .collect();
                (
                    *frame,
                    FrameActions {
                        stop: actions.stop,
                        visible: actions.visible,
                        events,
                    },
                )
            })
            .collect();
        Self { frames }
    }

    pub fn insert(&mut self, frame: u16, actions: FrameActions) {
        self.frames.insert(frame, actions);
    }

    pub fn frame(&self, frame: i32) -> Option<&FrameActions> {
        u16::try_from(frame)
            .ok()
            .and_then(|frame| self.frames.get(&frame))
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
