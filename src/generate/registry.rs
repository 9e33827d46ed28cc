// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Single-flight guard for the generate command

use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether a generate invocation is in progress.
///
/// At most one slot exists at a time. The slot is released when the
/// [`RunSlot`] is dropped, so every exit path of the holder releases it.
#[derive(Debug, Default)]
pub struct RunRegistry {
    active: AtomicBool,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `None` if another invocation holds it.
    pub fn try_acquire(&self) -> Option<RunSlot<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunSlot { registry: self })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Held for the lifetime of one generate invocation.
#[derive(Debug)]
pub struct RunSlot<'a> {
    registry: &'a RunRegistry,
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.registry.release();
    }
}
