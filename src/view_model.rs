use crate::status::{SlotName, Status};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::watch;
use tracing::{trace, warn};

/// One named slot in the view model
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedStatus {
    pub name: SlotName,
    /// Latest value; `None` until the first sample or push arrives
    pub current: Option<Status>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of accepted writes to this slot
    pub updates: u64,
}

impl TrackedStatus {
    fn pending(name: SlotName) -> Self {
        Self {
            name,
            current: None,
            updated_at: None,
            updates: 0,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.current.is_none()
    }
}

/// Latest known value of every tracked status.
///
/// `set` is the only mutation path. Writes are synchronous and never held
/// across an await point; every accepted write bumps the revision published
/// through [`AggregatorViewModel::subscribe`].
pub struct AggregatorViewModel {
    slots: RwLock<BTreeMap<SlotName, TrackedStatus>>,
    revision: watch::Sender<u64>,
}

impl AggregatorViewModel {
    pub fn new() -> Self {
        let slots = SlotName::ALL
            .into_iter()
            .map(|name| (name, TrackedStatus::pending(name)))
            .collect();
        let (revision, _) = watch::channel(0);

        Self {
            slots: RwLock::new(slots),
            revision,
        }
    }

    /// Store `status` in slot `name`.
    ///
    /// Returns `false` when the status variant does not match the slot's kind;
    /// the slot is left untouched in that case.
    pub fn set(&self, name: SlotName, status: Status) -> bool {
        if status.kind() != name.kind() {
            warn!(
                "Rejected {:?} status for slot '{}' (expects {:?})",
                status.kind(),
                name,
                name.kind()
            );
            return false;
        }

        {
            let mut slots = self.slots.write();
            let slot = slots
                .entry(name)
                .or_insert_with(|| TrackedStatus::pending(name));
            trace!("Slot '{}' updated to {}", name, status);
            slot.current = Some(status);
            slot.updated_at = Some(Utc::now());
            slot.updates += 1;
        }

        self.revision.send_modify(|revision| *revision += 1);
        true
    }

    /// Latest value of slot `name`, or `None` while pending
    pub fn get(&self, name: SlotName) -> Option<Status> {
        self.slots
            .read()
            .get(&name)
            .and_then(|slot| slot.current.clone())
    }

    pub fn tracked(&self, name: SlotName) -> TrackedStatus {
        self.slots
            .read()
            .get(&name)
            .cloned()
            .unwrap_or_else(|| TrackedStatus::pending(name))
    }

    /// Point-in-time copy of every slot, in display order
    pub fn view(&self) -> DashboardView {
        let slots = self.slots.read();
        DashboardView {
            revision: *self.revision.borrow(),
            slots: SlotName::ALL
                .into_iter()
                .map(|name| {
                    slots
                        .get(&name)
                        .cloned()
                        .unwrap_or_else(|| TrackedStatus::pending(name))
                })
                .collect(),
        }
    }

    /// Total number of accepted writes across all slots
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that changes whenever any slot is written
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for AggregatorViewModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the whole dashboard for presentation
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub revision: u64,
    pub slots: Vec<TrackedStatus>,
}

impl DashboardView {
    pub fn get(&self, name: SlotName) -> Option<&Status> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.current.as_ref())
    }

    pub fn pending_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_pending()).count()
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "revision {}", self.revision)?;
        for slot in &self.slots {
            match &slot.current {
                Some(status) => writeln!(f, "  {:<20} {}", slot.name.as_str(), status)?,
                None => writeln!(f, "  {:<20} pending", slot.name.as_str())?,
            }
        }
        Ok(())
    }
}
