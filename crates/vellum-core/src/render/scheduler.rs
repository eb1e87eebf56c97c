use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone)]
struct Slot {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Slots {
    by_id: HashMap<String, Slot>,
    next_generation: u64,
}

impl Slots {
    /// Cancels retry `generation` and forgets every id it covered.
    fn drop_generation(&mut self, generation: u64) {
        self.by_id.retain(|_, slot| {
            if slot.generation == generation {
                slot.token.cancel();
                false
            } else {
                true
            }
        });
    }
}

/// Delayed re-invocations keyed by placeholder id.
///
/// One scheduled retry may cover several ids. Scheduling again for any of
/// them cancels the earlier retry for all of them, and `cancel` drops it
/// outright.
#[derive(Debug, Default, Clone)]
pub struct RetryScheduler {
    slots: Arc<Mutex<Slots>>,
}

impl RetryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, ids: &[String], delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let generation = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            let generation = slots.next_generation;
            slots.next_generation += 1;
            let superseded: Vec<u64> = ids
                .iter()
                .filter_map(|id| slots.by_id.get(id).map(|slot| slot.generation))
                .collect();
            for previous in superseded {
                slots.drop_generation(previous);
            }
            for id in ids {
                let slot = Slot {
                    generation,
                    token: token.clone(),
                };
                slots.by_id.insert(id.clone(), slot);
            }
            generation
        };

        let slots = self.slots.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    debug!(target: "render::retry", generation, "Retry superseded");
                }
                () = tokio::time::sleep(delay) => {
                    slots
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .by_id
                        .retain(|_, slot| slot.generation != generation);
                    task.await;
                }
            }
        });
    }

    /// Cancels the retry covering `id`. Returns whether one was pending.
    ///
    /// The retry is shared with the other ids that failed in the same sweep,
    /// so they lose it too. Callers sweep the container again afterwards
    /// (as `RenderEngine::refresh` does), which picks those ids up.
    pub fn cancel(&self, id: &str) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        match slots.by_id.get(id).map(|slot| slot.generation) {
            Some(generation) => {
                slots.drop_generation(generation);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, slot) in slots.by_id.drain() {
            slot.token.cancel();
        }
    }

    /// Forgets ids for which `keep` is false. Their retry still fires if
    /// another id keeps it alive.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .retain(|id, _| keep(id));
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(id)
            .is_some_and(|slot| !slot.token.is_cancelled())
    }
}
