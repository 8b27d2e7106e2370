use std::ops::{Deref, DerefMut};
use tokio::sync::{OwnedMutexGuard, OwnedSemaphorePermit};

/// A client checked out of a [`Pool`](crate::server::database::pool::Pool).
pub(crate) struct Connection<M> {
    // dropped before the permit, so a waiter woken by the permit finds the slot unlocked
    guard: OwnedMutexGuard<M>,
    _permit: OwnedSemaphorePermit,
}

impl<M> Connection<M> {
    pub fn new(guard: OwnedMutexGuard<M>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            guard,
            _permit: permit,
        }
    }
}

impl<M> Deref for Connection<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.guard
    }
}

impl<M> DerefMut for Connection<M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut self.guard
    }
}
