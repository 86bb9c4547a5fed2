//! Hand-over of background loads to the render loop.
//!
//! A load runs on the async runtime and reports exactly one outcome through a
//! `futures` oneshot channel. The render loop owns the receiving [`AssetSlot`] and
//! polls it once per tick, so scene state is never touched off the event-loop thread.

use std::future::Future;

use futures::channel::oneshot;

use crate::resources::AssetLoadError;

type Outcome<T> = Result<T, AssetLoadError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Succeeded,
    Failed,
}

enum SlotState<T> {
    Pending(oneshot::Receiver<Outcome<T>>),
    Done(SlotStatus),
}

/// Receiving end of one asset load: `pending -> succeeded | failed`, never back.
pub struct AssetSlot<T> {
    label: String,
    state: SlotState<T>,
}

/// Producing end of an [`AssetSlot`]. Dropping it without completing fails the slot.
pub struct Completer<T> {
    label: String,
    tx: oneshot::Sender<Outcome<T>>,
}

impl<T> Completer<T> {
    pub fn complete(self, outcome: Outcome<T>) {
        if self.tx.send(outcome).is_err() {
            log::debug!("{} finished after its slot was dropped", self.label);
        }
    }

    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    pub fn fail(self, error: AssetLoadError) {
        self.complete(Err(error));
    }
}

impl<T> AssetSlot<T> {
    pub fn channel(label: impl Into<String>) -> (Completer<T>, Self) {
        let label = label.into();
        let (tx, rx) = oneshot::channel();
        (
            Completer {
                label: label.clone(),
                tx,
            },
            Self {
                label,
                state: SlotState::Pending(rx),
            },
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn status(&self) -> SlotStatus {
        match &self.state {
            SlotState::Pending(_) => SlotStatus::Pending,
            SlotState::Done(status) => *status,
        }
    }

    /// Returns the outcome the first time it is available, `None` before and after.
    pub fn poll(&mut self) -> Option<Outcome<T>> {
        let SlotState::Pending(rx) = &mut self.state else {
            return None;
        };
        let outcome = match rx.try_recv() {
            Ok(None) => return None,
            Ok(Some(outcome)) => outcome,
            Err(oneshot::Canceled) => Err(AssetLoadError::Canceled),
        };
        self.state = SlotState::Done(if outcome.is_ok() {
            SlotStatus::Succeeded
        } else {
            SlotStatus::Failed
        });
        Some(outcome)
    }
}

impl<T> std::fmt::Debug for AssetSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetSlot")
            .field("label", &self.label)
            .field("status", &self.status())
            .finish()
    }
}

/// Runs load futures in the background: on the tokio runtime natively, on the
/// browser's microtask queue on the web.
#[derive(Clone, Debug)]
pub struct Spawner {
    #[cfg(not(target_arch = "wasm32"))]
    handle: tokio::runtime::Handle,
}

#[cfg(not(target_arch = "wasm32"))]
impl Spawner {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }

    /// Starts `load` in the background and returns the slot its outcome lands in.
    pub fn load<T, F>(&self, label: impl Into<String>, load: F) -> AssetSlot<T>
    where
        T: Send + 'static,
        F: Future<Output = Outcome<T>> + Send + 'static,
    {
        let (completer, slot) = AssetSlot::channel(label);
        self.spawn(async move { completer.complete(load.await) });
        slot
    }
}

#[cfg(target_arch = "wasm32")]
impl Spawner {
    pub fn new() -> Self {
        Self {}
    }

    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + 'static,
    {
        wasm_bindgen_futures::spawn_local(fut);
    }

    pub fn load<T, F>(&self, label: impl Into<String>, load: F) -> AssetSlot<T>
    where
        T: 'static,
        F: Future<Output = Outcome<T>> + 'static,
    {
        let (completer, slot) = AssetSlot::channel(label);
        self.spawn(async move { completer.complete(load.await) });
        slot
    }
}
