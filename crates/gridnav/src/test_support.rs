//! Test support utilities for gridnav tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::navigator::{ElementRect, ElementRectProvider};

/// Height of one synthetic row.
const ROW_HEIGHT: f64 = 40.0;
/// Width of one synthetic member.
const MEMBER_WIDTH: f64 = 60.0;

/// An [`ElementRectProvider`] over fixed, replaceable layouts keyed by parent selector.
/// The member selector is ignored.
#[derive(Default)]
pub struct StaticRectProvider {
    /// Member rects per parent.
    layouts: Mutex<HashMap<String, Vec<ElementRect>>>,
}

impl StaticRectProvider {
    /// Provider with no parents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `parent` as rows with the given member counts.
    pub fn set_rows(&self, parent: &str, rows: &[usize]) {
        let rects = rows
            .iter()
            .zip(0u32..)
            .flat_map(|(&len, row)| {
                (0..len).zip(0u32..).map(move |(_, col)| ElementRect {
                    x: f64::from(col) * MEMBER_WIDTH,
                    y: f64::from(row) * ROW_HEIGHT,
                    width: MEMBER_WIDTH,
                    height: ROW_HEIGHT,
                })
            })
            .collect();
        self.layouts.lock().insert(parent.to_string(), rects);
    }

    /// Remove `parent`.
    pub fn remove(&self, parent: &str) {
        self.layouts.lock().remove(parent);
    }
}

impl ElementRectProvider for StaticRectProvider {
    fn member_rects(&self, parent: &str, _member: &str) -> Option<Vec<ElementRect>> {
        self.layouts.lock().get(parent).cloned()
    }
}
