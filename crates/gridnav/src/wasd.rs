//! WASD and vim-style cursor movement hotkeys over a [`GridNavigator`].

use std::sync::Arc;

use hotkeys_engine::{HotkeyInvocation, HotkeyOptions, HotkeysContext, callback};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::{GridError, Result},
    navigator::GridNavigator,
    sequence::{GridSequence, GridWrappedValue},
};

/// Receives every new cursor position. Returning true rolls the move back.
pub type CursorPositionCallback = Arc<dyn Fn(GridWrappedValue) -> bool + Send + Sync>;

/// Triggers and wording for [`CursorMovementWasd`]. An empty trigger disables its hotkey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementOptions {
    /// Sequence index the cursor starts on.
    pub initial_cursor_position: usize,
    /// Singular member name used in descriptions.
    pub sequence_item_name: String,
    /// Plural member name used in descriptions.
    pub sequence_item_name_plural: String,
    /// Move up.
    pub up_trigger: String,
    /// Move down.
    pub down_trigger: String,
    /// Move left.
    pub left_trigger: String,
    /// Move right.
    pub right_trigger: String,
    /// Finalizer of the `\d <key>` goto-member motion.
    pub goto_item_finalizer: String,
    /// Finalizer of the `\d <key>` goto-row motion.
    pub goto_row_finalizer: String,
    /// Jump to the start of the row.
    pub row_start_trigger: String,
    /// Jump to the end of the row.
    pub row_end_trigger: String,
    /// Jump to the first row.
    pub first_row_trigger: String,
    /// Jump to the last row.
    pub last_row_trigger: String,
}

impl Default for MovementOptions {
    fn default() -> Self {
        Self {
            initial_cursor_position: 0,
            sequence_item_name: "item".into(),
            sequence_item_name_plural: "items".into(),
            up_trigger: "w".into(),
            down_trigger: "s".into(),
            left_trigger: "a".into(),
            right_trigger: "d".into(),
            goto_item_finalizer: "g".into(),
            goto_row_finalizer: "l".into(),
            row_start_trigger: "shift+a".into(),
            row_end_trigger: "shift+d".into(),
            first_row_trigger: "shift+w".into(),
            last_row_trigger: "shift+s".into(),
        }
    }
}

/// State shared by the registered hotkey callbacks.
struct Mover {
    /// Grid being navigated.
    navigator: GridNavigator,
    /// Cursor listener.
    on_cursor: CursorPositionCallback,
    /// Triggers.
    options: MovementOptions,
}

impl Mover {
    /// Apply `forward`, report the new position, and apply `rollback` if asked to.
    ///
    /// The grid lock is not held while the listener runs.
    fn apply(
        &self,
        forward: impl FnOnce(&mut GridSequence) -> Option<GridWrappedValue>,
        rollback: impl FnOnce(&mut GridSequence),
    ) {
        let Some(Some(position)) = self.navigator.with_grid(forward) else {
            trace!("grid {} has no cursor", self.navigator.parent());
            return;
        };
        if (self.on_cursor)(position) {
            trace!("rolling back cursor move to {}", position.value);
            self.navigator.with_grid(rollback);
        }
    }

    /// Read a value off the grid.
    fn read<R>(&self, f: impl FnOnce(&GridSequence) -> R) -> Option<R> {
        self.navigator.with_grid(|g| f(g))
    }

    /// One step in the direction named by the combo.
    fn step(&self, invocation: &HotkeyInvocation) {
        let o = &self.options;
        let combo = invocation.combo.as_str();
        if combo == o.up_trigger {
            self.apply(GridSequence::move_up, |g| {
                g.move_down();
            });
        } else if combo == o.down_trigger {
            self.apply(GridSequence::move_down, |g| {
                g.move_up();
            });
        } else if combo == o.left_trigger {
            self.apply(GridSequence::move_left, |g| {
                g.move_right();
            });
        } else if combo == o.right_trigger {
            self.apply(GridSequence::move_right, |g| {
                g.move_left();
            });
        }
    }

    /// Jump to the 1-based member given as the motion.
    fn goto_item(&self, invocation: &HotkeyInvocation) {
        let Some(motion) = invocation.motion() else {
            return;
        };
        let Some(Some(start)) = self.read(GridSequence::cursor) else {
            return;
        };
        let requested = (motion as usize).saturating_sub(1);
        self.apply(
            |g| {
                let index = g.clamp_sequence_index(requested);
                g.set_cursor(index);
                g.cursor_wrapped()
            },
            |g| {
                g.set_cursor(start);
            },
        );
    }

    /// Jump to the 1-based row given as the motion.
    fn goto_row(&self, invocation: &HotkeyInvocation) {
        let Some(motion) = invocation.motion() else {
            return;
        };
        let Some(start_row) = self.read(GridSequence::cursor_row) else {
            return;
        };
        let requested = (motion as usize).saturating_sub(1);
        self.apply(
            |g| {
                let row = requested.min(g.len().saturating_sub(1));
                g.set_current_row(row);
                g.cursor_wrapped()
            },
            |g| {
                g.set_current_row(start_row);
            },
        );
    }

    /// Move within the row, restoring the column on rollback.
    fn within_row(&self, forward: impl FnOnce(&mut GridSequence) -> Option<GridWrappedValue>) {
        let Some(column) = self.read(GridSequence::cursor_column) else {
            return;
        };
        self.apply(forward, |g| {
            g.set_current_row_column(column);
        });
    }

    /// Move across rows, restoring the cursor on rollback.
    fn across_rows(&self, forward: impl FnOnce(&mut GridSequence) -> Option<GridWrappedValue>) {
        let Some(Some(start)) = self.read(GridSequence::cursor) else {
            return;
        };
        self.apply(forward, |g| {
            g.set_cursor(start);
        });
    }
}

/// Registers grid movement hotkeys on a context and drives a [`GridNavigator`] with them.
///
/// Default bindings: `w`/`a`/`s`/`d` step, `\d g` goes to a member, `\d l` goes to a
/// row, `shift+a`/`shift+d` jump to the row ends, and `shift+w`/`shift+s` jump to the
/// first and last rows.
pub struct CursorMovementWasd {
    /// Shared with the hotkey callbacks.
    mover: Arc<Mover>,
}

impl CursorMovementWasd {
    /// Create the helper. Nothing is registered until [`Self::setup`].
    pub fn new(
        navigator: GridNavigator,
        on_cursor: CursorPositionCallback,
        options: MovementOptions,
    ) -> Self {
        Self {
            mover: Arc::new(Mover {
                navigator,
                on_cursor,
                options,
            }),
        }
    }

    /// The navigator being driven.
    pub fn navigator(&self) -> &GridNavigator {
        &self.mover.navigator
    }

    /// Movement options.
    pub fn options(&self) -> &MovementOptions {
        &self.mover.options
    }

    /// Build the grid, place the initial cursor and register the hotkeys on `context`.
    ///
    /// Call once the grid container exists.
    pub fn setup(&self, context: &mut HotkeysContext) -> Result<()> {
        let nav = &self.mover.navigator;
        nav.setup()?;

        let initial = self.mover.options.initial_cursor_position;
        if initial != 0 {
            let placed = nav
                .with_grid(|g| g.set_cursor(initial))
                .ok_or(GridError::NotSetUp)?;
            if !placed {
                let len = nav.with_grid(|g| g.sequence_len()).unwrap_or_default();
                return Err(GridError::OutOfBounds {
                    index: initial,
                    len,
                });
            }
        }

        self.register_hotkeys(context);
        Ok(())
    }

    /// Register every enabled movement hotkey.
    fn register_hotkeys(&self, context: &mut HotkeysContext) {
        let o = &self.mover.options;
        let item = &o.sequence_item_name;
        let items = &o.sequence_item_name_plural;

        let steps: Vec<&str> = [
            &o.up_trigger,
            &o.down_trigger,
            &o.left_trigger,
            &o.right_trigger,
        ]
        .into_iter()
        .map(String::as_str)
        .filter(|t| !t.is_empty())
        .collect();
        if !steps.is_empty() {
            let mover = self.mover.clone();
            context.register(
                steps,
                &callback(move |_, inv| mover.step(inv)),
                &HotkeyOptions::described(format!("<navigation>Changes the focused {item}.")),
            );
        }

        if !o.goto_item_finalizer.is_empty() {
            let mover = self.mover.clone();
            context.register(
                [format!("\\d {}", o.goto_item_finalizer)],
                &callback(move |_, inv| mover.goto_item(inv)),
                &HotkeyOptions::described(format!("<navigation>Goes to a specific {item}.")),
            );
        }

        if !o.goto_row_finalizer.is_empty() {
            let mover = self.mover.clone();
            context.register(
                [format!("\\d {}", o.goto_row_finalizer)],
                &callback(move |_, inv| mover.goto_row(inv)),
                &HotkeyOptions::described(format!(
                    "<navigation>Goes to a specific line of {items}."
                )),
            );
        }

        let jumps: [(&str, fn(&Mover), &str); 4] = [
            (
                o.row_start_trigger.as_str(),
                |m| m.within_row(GridSequence::move_row_start),
                "<navigation>Moves the cursor to the start of the row.",
            ),
            (
                o.row_end_trigger.as_str(),
                |m| m.within_row(GridSequence::move_row_end),
                "<navigation>Moves the cursor to the end of the row.",
            ),
            (
                o.first_row_trigger.as_str(),
                |m| m.across_rows(GridSequence::focus_first_row),
                "<navigation>Moves the cursor to the first row.",
            ),
            (
                o.last_row_trigger.as_str(),
                |m| m.across_rows(GridSequence::focus_last_row),
                "<navigation>Moves the cursor to the last row.",
            ),
        ];
        for (trigger, handler, description) in jumps {
            if trigger.is_empty() {
                continue;
            }
            let mover = self.mover.clone();
            context.register(
                [trigger],
                &callback(move |_, _| handler(&mover)),
                &HotkeyOptions::described(description),
            );
        }
    }

    /// Release the navigator.
    pub fn destroy(&self) {
        self.mover.navigator.destroy();
    }
}
