use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use super::SurfaceFormat;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// A surface with no native window behind it.
///
/// Created on the UI thread; clones are cheap handles to the same surface so
/// the render worker can hold one for `make_current`. Only the validity flag
/// changes after creation.
#[derive(Debug, Clone)]
pub struct OffscreenSurface {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    id: u64,
    format: SurfaceFormat,
    created_on: ThreadId,
    valid: AtomicBool,
}

impl OffscreenSurface {
    pub fn new(format: SurfaceFormat) -> Self {
        let id = NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed);
        log::debug!("offscreen surface #{id} created ({format})");
        Self {
            inner: Arc::new(Inner {
                id,
                format,
                created_on: thread::current().id(),
                valid: AtomicBool::new(true),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    pub fn format(&self) -> SurfaceFormat {
        self.inner.format
    }

    #[inline]
    pub fn created_on(&self) -> ThreadId {
        self.inner.created_on
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// Marks the surface lost. Later `make_current` calls on it fail.
    pub fn invalidate(&self) {
        if self.inner.valid.swap(false, Ordering::AcqRel) {
            log::debug!("offscreen surface #{} invalidated", self.inner.id);
        }
    }
}
