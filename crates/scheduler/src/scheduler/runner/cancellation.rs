use tracing::debug;

use crate::scheduler::handle::RoutineHandle;

use super::Scheduler;

impl Scheduler {
    /// Cancel the chain started under `handle`.
    ///
    /// Only the chain's current leaf is scheduled, so the registry is scanned
    /// for the first node whose resume links lead back to the root. That leaf
    /// is removed along with every paused ancestor; none of them runs again.
    /// When the leaf is the node currently being stepped (a routine canceling
    /// its own chain), it is marked instead and released once its step
    /// returns. Returns false (a no-op) when the chain has already finished.
    pub fn cancel(&mut self, handle: RoutineHandle) -> bool {
        let root = handle.root();
        let leaf = self
            .registry
            .iter()
            .find(|id| self.registry.chain_reaches(*id, root));

        let Some(leaf) = leaf else {
            debug!(handle = ?handle, "Cancel found no active chain");
            return false;
        };

        if let Some(node) = self.registry.get_mut(leaf) {
            if node.is_stepping() {
                if node.cancel_requested {
                    return false;
                }
                node.cancel_requested = true;
                self.metrics.record_cancel();
                debug!(handle = ?handle, leaf = %leaf, "Routine chain canceled mid-step");
                return true;
            }
        }

        let released = self.registry.release_chain(leaf);
        self.metrics.record_cancel();
        debug!(handle = ?handle, leaf = %leaf, released, "Routine chain canceled");
        true
    }
}
