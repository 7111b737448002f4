use crate::status::{SlotName, Status};
use crate::view_model::AggregatorViewModel;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Liveness of one activation.
///
/// Every producer started by an activation writes through a child of the
/// activation's gate. Writes happen under the read locks of the gate chain
/// and [`ActivationGate::close`] flips the flag under the write lock, so once
/// `close` returns nothing behind that gate can reach the view model again.
#[derive(Clone)]
pub struct ActivationGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    id: Uuid,
    open: RwLock<bool>,
    token: CancellationToken,
    parent: Option<ActivationGate>,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GateInner {
                id: Uuid::new_v4(),
                open: RwLock::new(true),
                token: CancellationToken::new(),
                parent: None,
            }),
        }
    }

    /// Gate that closes with this one but can also be closed on its own
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(GateInner {
                id: self.inner.id,
                open: RwLock::new(true),
                token: self.inner.token.child_token(),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Identifier used to correlate log lines of one activation
    pub fn activation_id(&self) -> Uuid {
        self.inner.id
    }

    pub fn is_open(&self) -> bool {
        *self.inner.open.read()
            && self
                .inner
                .parent
                .as_ref()
                .map_or(true, ActivationGate::is_open)
    }

    /// Close the gate and cancel every task waiting on it or its children
    pub fn close(&self) {
        {
            let mut open = self.inner.open.write();
            *open = false;
        }
        self.inner.token.cancel();
    }

    /// Resolves once this gate or one of its ancestors has been closed
    pub async fn closed(&self) {
        self.inner.token.cancelled().await
    }

    /// Run `f` while holding the read lock of every gate in the chain
    fn run_if_open<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = &current.inner.parent {
            chain.push(parent);
            current = parent;
        }

        // Root first
        let mut guards = Vec::with_capacity(chain.len());
        for gate in chain.into_iter().rev() {
            let open = gate.inner.open.read();
            if !*open {
                return None;
            }
            guards.push(open);
        }

        Some(f())
    }
}

impl Default for ActivationGate {
    fn default() -> Self {
        Self::new()
    }
}

/// The only path from a producer into one view-model slot
#[derive(Clone)]
pub struct SlotWriter {
    slot: SlotName,
    view_model: Arc<AggregatorViewModel>,
    gate: ActivationGate,
}

impl SlotWriter {
    pub fn new(slot: SlotName, view_model: Arc<AggregatorViewModel>, gate: ActivationGate) -> Self {
        Self {
            slot,
            view_model,
            gate,
        }
    }

    pub fn slot(&self) -> SlotName {
        self.slot
    }

    pub fn gate(&self) -> &ActivationGate {
        &self.gate
    }

    /// Writer for the same slot behind a child gate, owned by one producer
    pub fn scoped(&self) -> Self {
        Self {
            slot: self.slot,
            view_model: Arc::clone(&self.view_model),
            gate: self.gate.child(),
        }
    }

    /// Write `status` if the owning activation is still live.
    ///
    /// Returns whether the view model accepted the write.
    pub fn write(&self, status: Status) -> bool {
        match self
            .gate
            .run_if_open(|| self.view_model.set(self.slot, status))
        {
            Some(accepted) => accepted,
            None => {
                debug!(
                    "Discarding update for slot '{}' after deactivation",
                    self.slot
                );
                false
            }
        }
    }
}
