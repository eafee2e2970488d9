//! Per-role work item queue.
//!
//! Each role has its own FIFO lane. Lanes are served round-robin in
//! [`Role::lane_order`]. Claiming an item is a compare-and-set on its status:
//! only a `Pending` item can be claimed, so nothing is dispatched twice.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::artifact::Artifact;
use crate::error::{CoreError, CoreResult};
use crate::role::Role;
use crate::work_item::{WorkItem, WorkItemId, WorkItemStatus};

/// Lane placement for a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Spawned from an integration issue; served before normal items.
    Issue,
    Normal,
}

#[derive(Debug, Clone, Copy)]
struct LaneEntry {
    id: WorkItemId,
    priority: Priority,
}

/// Owns every work item of a run and its lifecycle.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: HashMap<WorkItemId, WorkItem>,
    order: Vec<WorkItemId>,
    lanes: HashMap<Role, VecDeque<LaneEntry>>,
    cursor: usize,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a work item to its role's lane.
    ///
    /// Adding an id that is already known keeps the existing record and
    /// moves its single lane entry.
    pub fn enqueue(&mut self, item: WorkItem, priority: Priority) -> WorkItemId {
        let id = item.id;
        let role = item.role;
        if !self.items.contains_key(&id) {
            debug!("Enqueued {} item {} for {}", item.kind, id.short(), role);
            self.order.push(id);
            self.items.insert(id, item);
        }
        self.place(id, role, priority);
        id
    }

    /// Put an in-progress item back into its lane with rejection feedback.
    pub fn requeue(&mut self, id: WorkItemId, feedback: Vec<Artifact>) -> CoreResult<()> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or(CoreError::WorkItemNotFound(id))?;
        item.transition(WorkItemStatus::Pending)?;
        item.feedback = feedback;
        let role = item.role;
        let priority = if item.parent.is_some() {
            Priority::Issue
        } else {
            Priority::Normal
        };
        self.place(id, role, priority);
        debug!("Requeued item {} for {}", id.short(), role);
        Ok(())
    }

    /// Claim the next pending item, serving lanes round-robin.
    pub fn claim_next(&mut self) -> Option<WorkItem> {
        let lanes = Role::lane_order();
        for offset in 0..lanes.len() {
            let role = lanes[(self.cursor + offset) % lanes.len()];
            while let Some(entry) = self.lanes.get_mut(&role).and_then(VecDeque::pop_front) {
                if let Ok(item) = self.claim(entry.id) {
                    self.cursor = (self.cursor + offset + 1) % lanes.len();
                    return Some(item);
                }
            }
        }
        None
    }

    /// Claim a specific item. Fails unless it is `Pending`.
    pub fn claim(&mut self, id: WorkItemId) -> CoreResult<WorkItem> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or(CoreError::WorkItemNotFound(id))?;
        item.transition(WorkItemStatus::InProgress)?;
        let claimed = item.clone();
        self.remove_entry(id, claimed.role);
        Ok(claimed)
    }

    pub fn complete(&mut self, id: WorkItemId) -> CoreResult<()> {
        self.set_status(id, WorkItemStatus::Succeeded)
    }

    pub fn fail(&mut self, id: WorkItemId) -> CoreResult<()> {
        self.set_status(id, WorkItemStatus::Failed)
    }

    pub fn cancel(&mut self, id: WorkItemId) -> CoreResult<()> {
        self.set_status(id, WorkItemStatus::Cancelled)?;
        if let Some(role) = self.items.get(&id).map(|i| i.role) {
            self.remove_entry(id, role);
        }
        Ok(())
    }

    /// Cancel every item still waiting in a lane.
    pub fn cancel_pending(&mut self) -> Vec<WorkItemId> {
        let pending: Vec<WorkItemId> = self
            .order
            .iter()
            .copied()
            .filter(|id| {
                self.items
                    .get(id)
                    .is_some_and(|i| i.status() == WorkItemStatus::Pending)
            })
            .collect();
        for id in &pending {
            if let Some(item) = self.items.get_mut(id) {
                let _ = item.transition(WorkItemStatus::Cancelled);
            }
        }
        self.lanes.clear();
        pending
    }

    pub fn get(&self, id: WorkItemId) -> Option<&WorkItem> {
        self.items.get(&id)
    }

    /// All items in the order they were first enqueued.
    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    pub fn lane_len(&self, role: Role) -> usize {
        self.lanes.get(&role).map_or(0, VecDeque::len)
    }

    pub fn pending_count(&self) -> usize {
        self.lanes.values().map(VecDeque::len).sum()
    }

    /// No item is waiting in any lane.
    pub fn is_drained(&self) -> bool {
        self.pending_count() == 0
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the queue, returning items in enqueue order.
    pub fn into_items(mut self) -> Vec<WorkItem> {
        self.order
            .iter()
            .filter_map(|id| self.items.remove(id))
            .collect()
    }

    fn set_status(&mut self, id: WorkItemId, status: WorkItemStatus) -> CoreResult<()> {
        self.items
            .get_mut(&id)
            .ok_or(CoreError::WorkItemNotFound(id))?
            .transition(status)
    }

    fn place(&mut self, id: WorkItemId, role: Role, priority: Priority) {
        self.remove_entry(id, role);
        let lane = self.lanes.entry(role).or_default();
        let entry = LaneEntry { id, priority };
        match priority {
            Priority::Issue => {
                let at = lane
                    .iter()
                    .position(|e| e.priority == Priority::Normal)
                    .unwrap_or(lane.len());
                lane.insert(at, entry);
            }
            Priority::Normal => lane.push_back(entry),
        }
    }

    fn remove_entry(&mut self, id: WorkItemId, role: Role) {
        if let Some(lane) = self.lanes.get_mut(&role) {
            lane.retain(|e| e.id != id);
        }
    }
}
