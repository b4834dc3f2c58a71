//! Depth-ordered children of a movie clip, plus a name index kept in step
//! with the children's `name` fields.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use log::{debug, warn};

use crate::instance::InstanceRef;
use crate::observer::{ParentInfo, TimelineObserver};
use crate::snapshot::InstanceSnapshot;
use crate::tag::{TagContext, UpdateObjectData};
use crate::types::{Depth, Rectangle};

#[derive(Debug, Default)]
pub struct DisplayList {
    children: BTreeMap<Depth, InstanceRef>,
    name_to_depth: HashMap<String, Depth>,
    depth_to_name: HashMap<Depth, String>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Children in ascending depth order.
    /// Children from the lowest depth to the highest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Depth, &InstanceRef)> + '_ {
        self.children.iter().map(|(depth, child)| (*depth, child))
    }

    pub fn depths(&self) -> impl Iterator<Item = Depth> + '_ {
        self.children.keys().copied()
    }

    pub fn has_at_depth(&self, depth: Depth) -> bool {
        self.children.contains_key(&depth)
    }

    pub fn get_at_depth(&self, depth: Depth) -> Option<InstanceRef> {
        self.children.get(&depth).cloned()
    }

    /// The `index`-th child in depth order.
    pub fn get_at_index(&self, index: usize) -> Option<InstanceRef> {
        self.children.values().nth(index).cloned()
    }

    pub fn depth_of_name(&self, name: &str) -> Option<Depth> {
        self.name_to_depth.get(name).copied()
    }

    pub fn get_by_name(&self, name: &str) -> Option<InstanceRef> {
        self.depth_of_name(name)
            .and_then(|depth| self.get_at_depth(depth))
    }

    pub fn name_at_depth(&self, depth: Depth) -> Option<&str> {
        self.depth_to_name.get(&depth).map(String::as_str)
    }

    /// Puts `instance` at `depth`, evicting any occupant. An instance already
    /// parented elsewhere in this list moves rather than being duplicated.
    pub fn set_at_depth(&mut self, cx: &mut TagContext<'_>, depth: Depth, instance: InstanceRef) {
        let previous_depth = instance.borrow().state().depth_in_parent();
        if let Some(previous_depth) = previous_depth {
            let already_here = self
                .children
                .get(&previous_depth)
                .is_some_and(|child| Rc::ptr_eq(child, &instance));
            if already_here {
                if previous_depth == depth {
                    return;
                }
                let _ = self.remove_at_depth(previous_depth);
            } else {
                warn!(
                    "{}: instance placed at depth {depth} is still parented at depth {previous_depth} \
                     of another display list",
                    cx.owner
                );
            }
        }

        if let Some(evicted) = self.remove_at_depth(depth) {
            debug!(
                "{}: depth {depth} replaced definition {}",
                cx.owner,
                evicted.borrow().definition_id()
            );
        }

        let name = {
            let mut child = instance.borrow_mut();
            child.state_mut().set_depth_in_parent(Some(depth));
            child.name().to_string()
        };
        self.children.insert(depth, Rc::clone(&instance));
        self.update_name(&name, depth);

        let child = instance.borrow();
        if let Some(clip) = child.as_movie_clip() {
            clip.report_on_add_to_parent_if_needed(cx.observer, Some(cx.owner));
        }
    }

    /// Applies `data` to `instance` (which must live at `data.depth`) and
    /// refreshes the name index.
    pub(crate) fn apply_update(
        &mut self,
        instance: &InstanceRef,
        data: &UpdateObjectData,
        with_defaults: bool,
    ) {
        let name = {
            let mut child = instance.borrow_mut();
            let state = child.state_mut();
            if with_defaults {
                data.apply_with_defaults_to(state);
            } else {
                data.apply_to(state);
            }
            state.name().to_string()
        };
        if with_defaults || data.has_name() {
            self.update_name(&name, data.depth);
        }
    }

    /// Renames the child at `depth`. Returns false if the slot is empty.
    pub fn set_name_at_depth(&mut self, depth: Depth, name: &str) -> bool {
        let Some(child) = self.children.get(&depth) else {
            return false;
        };
        child.borrow_mut().state_mut().set_name(name);
        self.update_name(name, depth);
        true
    }

    fn update_name(&mut self, name: &str, depth: Depth) {
        if let Some(old) = self.depth_to_name.remove(&depth) {
            if self.name_to_depth.get(&old) == Some(&depth) {
                self.name_to_depth.remove(&old);
            }
        }
        if name.is_empty() {
            return;
        }
        // A duplicate name shadows the earlier holder in lookups.
        if let Some(shadowed) = self.name_to_depth.insert(name.to_string(), depth) {
            if shadowed != depth {
                debug!("name '{name}' moves from depth {shadowed} to depth {depth}");
                self.depth_to_name.remove(&shadowed);
            }
        }
        self.depth_to_name.insert(depth, name.to_string());
    }

    pub fn remove_at_depth(&mut self, depth: Depth) -> Option<InstanceRef> {
        let removed = self.children.remove(&depth)?;
        removed.borrow_mut().state_mut().set_depth_in_parent(None);
        self.update_name("", depth);
        Some(removed)
    }

    pub fn remove_at_index(&mut self, index: usize) -> Option<InstanceRef> {
        let depth = self.children.keys().nth(index).copied()?;
        self.remove_at_depth(depth)
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<InstanceRef> {
        let depth = self.depth_of_name(name)?;
        self.remove_at_depth(depth)
    }

    pub fn remove_all(&mut self) {
        for child in self.children.values() {
            child.borrow_mut().state_mut().set_depth_in_parent(None);
        }
        self.children.clear();
        self.name_to_depth.clear();
        self.depth_to_name.clear();
    }

    /// Empties this list and, depth-first, the lists of every descendant
    /// movie clip.
    pub fn remove_all_recursive(&mut self) {
        for child in self.children.values() {
            if let Some(clip) = child.borrow_mut().as_movie_clip_mut() {
                clip.display_list_mut().remove_all_recursive();
            }
        }
        self.remove_all();
    }

    /// Shifts every child one depth up and returns the first free depth
    /// above them (1 when the list is empty).
    pub fn increase_all_child_depth_by_one(&mut self) -> Depth {
        let Some(&top) = self.children.keys().next_back() else {
            return 1;
        };
        if top == Depth::MAX {
            warn!("cannot shift children past depth {top}");
            return top;
        }

        let children = std::mem::take(&mut self.children);
        self.children = children
            .into_iter()
            .map(|(depth, child)| {
                child
                    .borrow_mut()
                    .state_mut()
                    .set_depth_in_parent(Some(depth + 1));
                (depth + 1, child)
            })
            .collect();
        self.depth_to_name = std::mem::take(&mut self.depth_to_name)
            .into_iter()
            .map(|(depth, name)| (depth + 1, name))
            .collect();
        for depth in self.name_to_depth.values_mut() {
            *depth += 1;
        }
        top.saturating_add(2)
    }

    pub(crate) fn advance(&self, observer: &mut dyn TimelineObserver, owner: ParentInfo<'_>) {
        for child in self.children.values() {
            child.borrow_mut().advance(observer, Some(owner));
        }
    }

    pub(crate) fn advance_to_frame0(
        &self,
        observer: &mut dyn TimelineObserver,
        owner: ParentInfo<'_>,
    ) {
        for child in self.children.values() {
            child.borrow_mut().advance_to_frame0(observer, Some(owner));
        }
    }

    pub(crate) fn deep_clone(&self, observer: &mut dyn TimelineObserver) -> DisplayList {
        let children = self
            .children
            .iter()
            .map(|(depth, child)| {
                let mut clone = child.borrow().clone_instance(observer);
                clone.state_mut().set_depth_in_parent(Some(*depth));
                (*depth, Rc::new(RefCell::new(clone)))
            })
            .collect();
        DisplayList {
            children,
            name_to_depth: self.name_to_depth.clone(),
            depth_to_name: self.depth_to_name.clone(),
        }
    }

    /// Union of the visible children's bounds.
    pub fn compute_bounds(&self) -> Option<Rectangle> {
        self.children
            .values()
            .filter_map(|child| child.borrow().compute_bounds())
            .reduce(|acc, bounds| acc.union(&bounds))
    }

    pub(crate) fn snapshot(&self) -> BTreeMap<Depth, InstanceSnapshot> {
        self.children
            .iter()
            .map(|(depth, child)| (*depth, child.borrow().snapshot()))
            .collect()
    }
}
