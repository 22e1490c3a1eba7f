//! Component node arena.
//!
//! Nodes live in a [`ComponentGraph`] and are addressed by [`ComponentId`].
//! The owner link is a parent index and the child list a vector of ids, so the
//! tree has no reference cycles. Ids are assigned monotonically per graph and
//! never reused; a removed node keeps its slot so stale references to it can be
//! recognised and resolved to absent.

use std::fmt;

use crate::descriptor::Component;
use crate::error::{Result, StateError};

/// Graph-local identity of a component node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct NodeSlot {
    owner: Option<ComponentId>,
    list: Vec<ComponentId>,
    is_hide: bool,
    removed: bool,
    state: Box<dyn Component>,
}

/// Arena of component nodes forming one or more ownership trees.
#[derive(Debug, Default)]
pub struct ComponentGraph {
    slots: Vec<NodeSlot>,
}

impl ComponentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node without owner (a graph root).
    pub fn add_root<C: Component>(&mut self, state: C) -> ComponentId {
        self.push_slot(None, Box::new(state))
    }

    /// Create a node and append it to `owner`'s list.
    pub fn add<C: Component>(&mut self, owner: ComponentId, state: C) -> Result<ComponentId> {
        self.add_boxed(Some(owner), Box::new(state))
    }

    /// Create a node from boxed state; `owner == None` creates a root.
    pub fn add_boxed(
        &mut self,
        owner: Option<ComponentId>,
        state: Box<dyn Component>,
    ) -> Result<ComponentId> {
        if let Some(owner) = owner {
            self.slot(owner)?;
        }
        let id = self.push_slot(owner, state);
        if let Some(owner) = owner {
            self.slots[owner.index()].list.push(id);
        }
        Ok(id)
    }

    fn push_slot(&mut self, owner: Option<ComponentId>, state: Box<dyn Component>) -> ComponentId {
        let id = ComponentId(self.slots.len() as u32);
        self.slots.push(NodeSlot {
            owner,
            list: Vec::new(),
            is_hide: false,
            removed: false,
            state,
        });
        id
    }

    /// Detach `id` from its owner's list and clear its owner.
    ///
    /// Children are not touched; they stay reachable only through the removed
    /// node. References to the removed subtree resolve to absent from then on.
    pub fn remove(&mut self, id: ComponentId) -> Result<()> {
        let owner = self.slot(id)?.owner;
        if let Some(owner) = owner {
            self.slots[owner.index()].list.retain(|child| *child != id);
        }
        let slot = &mut self.slots[id.index()];
        slot.owner = None;
        slot.removed = true;
        Ok(())
    }

    /// Re-parent `id` under `new_owner`, appending it to the end of its list.
    pub fn move_to(&mut self, id: ComponentId, new_owner: ComponentId) -> Result<()> {
        self.slot(id)?;
        self.slot(new_owner)?;

        // new_owner may not be id itself or anything below it
        let mut cursor = Some(new_owner);
        while let Some(current) = cursor {
            if current == id {
                return Err(StateError::OwnershipCycle {
                    node: id,
                    owner: new_owner,
                });
            }
            cursor = self.slots[current.index()].owner;
        }

        if let Some(old_owner) = self.slots[id.index()].owner {
            self.slots[old_owner.index()].list.retain(|child| *child != id);
        }
        self.slots[new_owner.index()].list.push(id);
        let slot = &mut self.slots[id.index()];
        slot.owner = Some(new_owner);
        slot.removed = false;
        Ok(())
    }

    fn slot(&self, id: ComponentId) -> Result<&NodeSlot> {
        self.slots
            .get(id.index())
            .ok_or(StateError::UnknownComponent(id))
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        id.index() < self.slots.len()
    }

    /// Number of nodes ever created in this graph, removed ones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn owner(&self, id: ComponentId) -> Option<ComponentId> {
        self.slots.get(id.index()).and_then(|slot| slot.owner)
    }

    pub fn list(&self, id: ComponentId) -> &[ComponentId] {
        self.slots
            .get(id.index())
            .map(|slot| slot.list.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_hide(&self, id: ComponentId) -> bool {
        self.slots.get(id.index()).is_some_and(|slot| slot.is_hide)
    }

    pub fn set_hide(&mut self, id: ComponentId, is_hide: bool) -> Result<()> {
        self.slot(id)?;
        self.slots[id.index()].is_hide = is_hide;
        Ok(())
    }

    pub fn state(&self, id: ComponentId) -> Option<&dyn Component> {
        self.slots.get(id.index()).map(|slot| slot.state.as_ref())
    }

    pub fn state_mut(&mut self, id: ComponentId) -> Option<&mut dyn Component> {
        self.slots.get_mut(id.index()).map(|slot| slot.state.as_mut())
    }

    pub fn type_name(&self, id: ComponentId) -> Option<&'static str> {
        self.state(id).map(|state| state.type_name())
    }

    /// Typed access to a node's state.
    pub fn get<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.state(id)?.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.state_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Follow owner links up to the top of `id`'s tree.
    pub fn root_of(&self, id: ComponentId) -> Option<ComponentId> {
        let mut current = id;
        loop {
            match self.slots.get(current.index())?.owner {
                Some(owner) => current = owner,
                None => return Some(current),
            }
        }
    }

    /// True when `id` or one of its owners was removed.
    pub fn is_removed(&self, id: ComponentId) -> bool {
        self.root_of(id)
            .and_then(|root| self.slots.get(root.index()))
            .is_some_and(|slot| slot.removed)
    }

    /// Live roots, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.owner.is_none() && !slot.removed)
            .map(|(index, _)| ComponentId(index as u32))
    }

    /// All nodes under `root`, depth-first and in list order (root excluded).
    ///
    /// The iterator is `Clone`; a clone restarts from where the original was.
    pub fn descendants(&self, root: ComponentId) -> Descendants<'_> {
        let mut stack: Vec<ComponentId> = self.list(root).to_vec();
        stack.reverse();
        Descendants { graph: self, stack }
    }

    /// Descendants of `root` whose state is a `T`.
    pub fn descendants_of<T: Component>(
        &self,
        root: ComponentId,
    ) -> impl Iterator<Item = ComponentId> + '_ {
        self.descendants(root)
            .filter(move |id| self.get::<T>(*id).is_some())
    }
}

/// Pre-order iterator over a subtree, see [`ComponentGraph::descendants`].
#[derive(Clone)]
pub struct Descendants<'g> {
    graph: &'g ComponentGraph,
    stack: Vec<ComponentId>,
}

impl Iterator for Descendants<'_> {
    type Item = ComponentId;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.graph.list(next).iter().rev().copied());
        Some(next)
    }
}
