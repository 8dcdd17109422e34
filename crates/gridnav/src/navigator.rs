//! Keeps a [`GridSequence`] in sync with the laid-out elements it describes.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, trace, warn};

use crate::{
    error::{GridError, Result},
    sequence::GridSequence,
};

/// Bounding box of one laid-out element.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElementRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Source of element geometry.
pub trait ElementRectProvider: Send + Sync {
    /// Rects of the elements matching `member` inside `parent`, in document order.
    ///
    /// `None` means the parent does not exist.
    fn member_rects(&self, parent: &str, member: &str) -> Option<Vec<ElementRect>>;
}

/// A layout change that invalidates the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridChange {
    /// Members were added or removed.
    Mutation,
    /// The viewport was resized.
    Resize,
}

/// Proposes a cursor after a rebuild, given the previous cursor and the new member count.
pub type CursorCorrection = Arc<dyn Fn(usize, usize) -> Option<usize> + Send + Sync>;

/// Shared navigator state.
struct Inner {
    /// Selector of the grid container.
    parent: String,
    /// Selector of the grid members within the container.
    member: String,
    /// Element geometry.
    provider: Arc<dyn ElementRectProvider>,
    /// The grid, once set up.
    grid: Mutex<Option<GridSequence>>,
    /// Optional post-rebuild cursor proposal.
    correction: Mutex<Option<CursorCorrection>>,
    /// Task rebuilding the grid on layout changes.
    observer: Mutex<Option<JoinHandle<()>>>,
    /// `destroy` was called.
    destroyed: AtomicBool,
}

/// Grid over the members of a container, rebuilt when its layout changes.
///
/// Call [`Self::setup`] once the container exists and [`Self::destroy`] when done.
/// Clones share state.
#[derive(Clone)]
pub struct GridNavigator {
    /// Shared state.
    inner: Arc<Inner>,
}

impl GridNavigator {
    /// Create a navigator for `member` elements inside `parent`.
    pub fn new(
        parent: impl Into<String>,
        member: impl Into<String>,
        provider: Arc<dyn ElementRectProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                parent: parent.into(),
                member: member.into(),
                provider,
                grid: Mutex::new(None),
                correction: Mutex::new(None),
                observer: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    /// Install a cursor correction consulted after every rebuild.
    pub fn set_cursor_correction(&self, correction: CursorCorrection) {
        *self.inner.correction.lock() = Some(correction);
    }

    /// Container selector.
    pub fn parent(&self) -> &str {
        &self.inner.parent
    }

    /// Scan the members and build the grid.
    ///
    /// A missing container is logged and reported as [`GridError::MissingParent`].
    pub fn setup(&self) -> Result<()> {
        self.check_alive()?;
        let grid = self.scan()?;
        debug!(
            "grid {} set up with rows {:?}",
            self.inner.parent,
            grid.row_lengths()
        );
        *self.inner.grid.lock() = Some(grid);
        Ok(())
    }

    /// Fail after [`Self::destroy`].
    fn check_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(GridError::Destroyed);
        }
        Ok(())
    }

    /// Read the member rects into a fresh grid.
    fn scan(&self) -> Result<GridSequence> {
        let Some(rects) = self
            .inner
            .provider
            .member_rects(&self.inner.parent, &self.inner.member)
        else {
            warn!("grid parent {} not found", self.inner.parent);
            return Err(GridError::MissingParent(self.inner.parent.clone()));
        };
        Ok(GridSequence::from_positions(rects.iter().map(|r| r.y)))
    }

    /// Rebuild after a layout change, carrying the cursor over.
    ///
    /// The cursor correction, if any, proposes the new cursor. Otherwise the previous
    /// sequence index is clamped into the new bounds.
    pub fn rebuild(&self) -> Result<()> {
        self.check_alive()?;
        let mut fresh = self.scan()?;
        let previous = self.inner.grid.lock().as_ref().and_then(GridSequence::cursor);
        let correction = self.inner.correction.lock().clone();

        if let Some(previous) = previous
            && !fresh.is_empty()
        {
            let proposed = correction.and_then(|f| f(previous, fresh.sequence_len()));
            let index = fresh.clamp_sequence_index(proposed.unwrap_or(previous));
            fresh.set_cursor(index);
        }
        trace!(
            "grid {} rebuilt with rows {:?}",
            self.inner.parent,
            fresh.row_lengths()
        );
        *self.inner.grid.lock() = Some(fresh);
        Ok(())
    }

    /// Rebuild on every change received from `changes` until the channel closes or the
    /// navigator is destroyed.
    pub fn observe(&self, mut changes: mpsc::UnboundedReceiver<GridChange>) {
        let nav = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                trace!("grid {} change: {:?}", nav.inner.parent, change);
                if let Err(e) = nav.rebuild() {
                    warn!("grid {} rebuild failed: {}", nav.inner.parent, e);
                    if e == GridError::Destroyed {
                        break;
                    }
                }
            }
        });
        if let Some(old) = self.inner.observer.lock().replace(handle) {
            old.abort();
        }
    }

    /// Run `f` on the grid. `None` before setup or after destroy.
    pub fn with_grid<R>(&self, f: impl FnOnce(&mut GridSequence) -> R) -> Option<R> {
        self.inner.grid.lock().as_mut().map(f)
    }

    /// Copy of the grid.
    pub fn snapshot(&self) -> Option<GridSequence> {
        self.inner.grid.lock().clone()
    }

    /// True after [`Self::destroy`].
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    /// Stop observing and release the grid.
    pub fn destroy(&self) {
        self.inner.destroyed.store(true, Ordering::Release);
        if let Some(handle) = self.inner.observer.lock().take() {
            handle.abort();
        }
        *self.inner.grid.lock() = None;
        debug!("grid {} destroyed", self.inner.parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticRectProvider;

    fn navigator(rows: &[usize]) -> (GridNavigator, Arc<StaticRectProvider>) {
        let provider = Arc::new(StaticRectProvider::new());
        provider.set_rows("#grid", rows);
        let nav = GridNavigator::new("#grid", ".item", provider.clone());
        (nav, provider)
    }

    #[test]
    fn missing_parent_is_an_error() {
        let provider = Arc::new(StaticRectProvider::new());
        let nav = GridNavigator::new("#nope", ".item", provider);
        assert_eq!(nav.setup(), Err(GridError::MissingParent("#nope".into())));
        assert_eq!(nav.snapshot(), None);
    }

    #[test]
    fn rebuild_clamps_the_cursor() {
        let (nav, provider) = navigator(&[3, 3]);
        nav.setup().expect("setup");
        nav.with_grid(|g| g.set_cursor(5));
        provider.set_rows("#grid", &[2, 1]);
        nav.rebuild().expect("rebuild");
        assert_eq!(nav.with_grid(|g| g.cursor()).flatten(), Some(2));
    }

    #[test]
    fn rebuild_uses_the_correction() {
        let (nav, provider) = navigator(&[3, 3]);
        nav.setup().expect("setup");
        nav.with_grid(|g| g.set_cursor(2));
        nav.set_cursor_correction(Arc::new(|prev: usize, _: usize| Some(prev + 1)));
        provider.set_rows("#grid", &[4, 3]);
        nav.rebuild().expect("rebuild");
        let cursor = nav.with_grid(|g| (g.cursor(), g.cursor_row())).expect("grid");
        assert_eq!(cursor, (Some(3), 0));
    }

    #[test]
    fn destroyed_navigator_refuses_work() {
        let (nav, _provider) = navigator(&[2]);
        nav.setup().expect("setup");
        nav.destroy();
        assert!(nav.is_destroyed());
        assert_eq!(nav.snapshot(), None);
        assert_eq!(nav.rebuild(), Err(GridError::Destroyed));
    }
}
