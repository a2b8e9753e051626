use super::*;
use std::sync::atomic::Ordering;

/// Read-only views of the registry for debugging and monitoring.
impl HandleRegistry {
    /// Token the next insertion will receive.
    ///
    /// Loaded with relaxed ordering since this is only used for diagnostics.
    pub fn next_token(&self) -> u64 {
        self.next_token.load(Ordering::Relaxed)
    }

    /// Tokens of every outstanding handle, oldest first.
    pub fn live_tokens(&self) -> Vec<u64> {
        let mut tokens: Vec<u64> = self.slots.lock().live.values().map(|a| a.token).collect();
        tokens.sort_unstable();
        tokens
    }

    /// Total payload bytes currently held for consumers.
    pub fn live_bytes(&self) -> usize {
        self.slots.lock().live.values().map(Allocation::length).sum()
    }

    /// Token of an outstanding handle, if it is live.
    pub fn token_of(&self, handle: *const BufferHandle) -> Option<u64> {
        self.slots.lock().live.get(&(handle as usize)).map(|a| a.token)
    }
}
