//! Ordered, groupable collection of build presets with a persisted selection.
//!
//! Selection is an anchor index plus a signed range: the selected presets
//! are `[anchor, anchor + range]` when the range is positive and
//! `[anchor + range, anchor]` when it is negative. Both values are clamped
//! to the current preset count after every structural mutation and again
//! on every read.

use std::ops::{Range, RangeInclusive};
use std::sync::Arc;

use tracing::debug;

use crate::error::PresetsError;
use crate::preferences::Preferences;
use crate::preset::BuildPreset;

/// Inclusive index bounds of the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionBounds {
    pub least: usize,
    pub most: usize,
}

impl SelectionBounds {
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.least..=self.most
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices().contains(&index)
    }

    /// Number of selected entries.
    pub fn count(&self) -> usize {
        self.most - self.least + 1
    }
}

/// Owns all presets and the shared selection state.
pub struct BuildSettingsStore {
    presets: Vec<BuildPreset>,
    prefs: Arc<Preferences>,
}

impl BuildSettingsStore {
    pub fn new(presets: Vec<BuildPreset>, prefs: Arc<Preferences>) -> Self {
        let store = Self { presets, prefs };
        store.clamp_selection();
        store
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn presets(&self) -> &[BuildPreset] {
        &self.presets
    }

    pub fn get(&self, index: usize) -> Option<&BuildPreset> {
        self.presets.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut BuildPreset> {
        self.presets.get_mut(index)
    }

    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.prefs
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Selected anchor index, or `None` when the store is empty.
    pub fn selected_index(&self) -> Option<usize> {
        let max = self.max_index()?;
        Some(self.prefs.selected_index().clamp(0, max) as usize)
    }

    /// Signed range anchored at the selected index, clamped to the store.
    pub fn selection_range(&self) -> i64 {
        let (Some(max), Some(anchor)) = (self.max_index(), self.selected_index()) else {
            return 0;
        };
        let anchor = anchor as i64;
        anchor
            .saturating_add(self.prefs.selection_range())
            .clamp(0, max)
            - anchor
    }

    pub fn selection_bounds(&self) -> Option<SelectionBounds> {
        let anchor = self.selected_index()? as i64;
        let other = anchor + self.selection_range();
        Some(SelectionBounds {
            least: anchor.min(other) as usize,
            most: anchor.max(other) as usize,
        })
    }

    pub fn selected(&self) -> Option<&BuildPreset> {
        self.selected_index().and_then(|i| self.presets.get(i))
    }

    /// Selects a single preset.
    pub fn select(&mut self, index: usize) {
        self.prefs.set_selection(index as i64, 0);
        self.clamp_selection();
    }

    /// Extends the selection from the current anchor to `index`.
    pub fn extend_selection_to(&mut self, index: usize) {
        let anchor = self.selected_index().unwrap_or(0) as i64;
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        self.prefs.set_selection_range(index.saturating_sub(anchor));
        self.clamp_selection();
    }

    /// Sets anchor and signed range directly.
    pub fn set_selection(&mut self, anchor: usize, range: i64) {
        let anchor = i64::try_from(anchor).unwrap_or(i64::MAX);
        self.prefs.set_selection(anchor, range);
        self.clamp_selection();
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    pub fn append(&mut self, preset: BuildPreset) {
        self.presets.push(preset);
        self.clamp_selection();
    }

    /// Inserts `preset` at `at`. The selected preset stays selected.
    pub fn insert(&mut self, at: usize, preset: BuildPreset) -> Result<(), PresetsError> {
        if at > self.presets.len() {
            return Err(PresetsError::InvalidIndex {
                index: at,
                len: self.presets.len(),
            });
        }
        let had_presets = !self.presets.is_empty();
        self.presets.insert(at, preset);
        if had_presets {
            let selected = self.prefs.selected_index();
            if at as i64 <= selected {
                self.prefs.set_selected_index(selected + 1);
            }
        }
        self.clamp_selection();
        Ok(())
    }

    /// Deep-copies `[lo, hi]` and inserts the copies right after `hi`.
    ///
    /// The copies become the new selection.
    pub fn duplicate(&mut self, lo: usize, hi: usize) -> Result<(), PresetsError> {
        let len = self.presets.len();
        if lo > hi || hi >= len {
            return Err(PresetsError::InvalidIndex { index: hi, len });
        }
        let copies: Vec<BuildPreset> = self.presets[lo..=hi].to_vec();
        let count = copies.len();
        self.presets.splice(hi + 1..hi + 1, copies);
        self.prefs.set_selection((hi + 1) as i64, (count - 1) as i64);
        self.clamp_selection();
        debug!(lo, hi, count, "duplicated presets");
        Ok(())
    }

    /// Duplicates the current selection range.
    pub fn duplicate_selection(&mut self) -> Result<(), PresetsError> {
        match self.selection_bounds() {
            Some(b) => self.duplicate(b.least, b.most),
            None => Ok(()),
        }
    }

    /// Moves one preset. The selected preset stays selected.
    ///
    /// Returns `false` without changes when either index is out of range.
    pub fn move_preset(&mut self, from: usize, to: usize) -> bool {
        let len = self.presets.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }
        let preset = self.presets.remove(from);
        self.presets.insert(to, preset);

        let selected = self.prefs.selected_index();
        let (from_i, to_i) = (from as i64, to as i64);
        let next = if selected == from_i {
            to_i
        } else if from_i < selected && to_i >= selected {
            selected - 1
        } else if from_i > selected && to_i <= selected {
            selected + 1
        } else {
            selected
        };
        self.prefs.set_selected_index(next);
        self.clamp_selection();
        true
    }

    pub fn move_up(&mut self, index: usize) -> bool {
        index > 0 && self.move_preset(index, index - 1)
    }

    pub fn move_down(&mut self, index: usize) -> bool {
        self.move_preset(index, index + 1)
    }

    /// Removes the preset at `at`. Out-of-range indices are a no-op.
    pub fn delete(&mut self, at: usize) -> Option<BuildPreset> {
        if at >= self.presets.len() {
            return None;
        }
        let removed = self.presets.remove(at);
        let selected = self.prefs.selected_index();
        if at as i64 <= selected {
            self.prefs.set_selected_index(selected.saturating_sub(1).max(0));
        }
        self.clamp_selection();
        Some(removed)
    }

    /// Moves the whole selection so the anchor lands on `target`.
    ///
    /// Every selected preset shifts by `target - anchor`, keeping their
    /// relative order. If any of them would leave the store the move is
    /// aborted and `false` is returned.
    pub fn drag_selection(&mut self, target: usize) -> bool {
        let (Some(bounds), Some(anchor)) = (self.selection_bounds(), self.selected_index()) else {
            return false;
        };
        let shift = target as i64 - anchor as i64;
        if shift == 0 {
            return true;
        }

        let new_least = bounds.least as i64 + shift;
        let new_most = bounds.most as i64 + shift;
        if new_least < 0 || new_most >= self.presets.len() as i64 {
            debug!(target, shift, "drag aborted, destination out of bounds");
            return false;
        }

        let block: Vec<BuildPreset> = self.presets.drain(bounds.indices()).collect();
        let at = new_least as usize;
        self.presets.splice(at..at, block);

        self.prefs.set_selected_index(anchor as i64 + shift);
        self.clamp_selection();
        true
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    /// Header owning the preset at `index`, if any.
    ///
    /// Headers themselves belong to no group.
    pub fn group_of(&self, index: usize) -> Option<usize> {
        if self.presets.get(index)?.is_group_header {
            return None;
        }
        (0..index).rev().find(|&i| self.presets[i].is_group_header)
    }

    /// Indices of the presets under the header at `header`.
    pub fn children(&self, header: usize) -> Range<usize> {
        match self.presets.get(header) {
            Some(p) if p.is_group_header => {
                let end = self.presets[header + 1..]
                    .iter()
                    .position(|p| p.is_group_header)
                    .map_or(self.presets.len(), |offset| header + 1 + offset);
                header + 1..end
            }
            _ => header..header,
        }
    }

    pub fn set_collapsed(&mut self, header: usize, collapsed: bool) {
        if let Some(p) = self.presets.get_mut(header)
            && p.is_group_header
        {
            p.collapsed = collapsed;
        }
    }

    pub fn toggle_collapsed(&mut self, header: usize) {
        if let Some(p) = self.presets.get(header) {
            let collapsed = !p.collapsed;
            self.set_collapsed(header, collapsed);
        }
    }

    /// True when the entry exists and is not hidden by a collapsed header.
    pub fn is_visible(&self, index: usize) -> bool {
        if index >= self.presets.len() {
            return false;
        }
        match self.group_of(index) {
            Some(header) => !self.presets[header].collapsed,
            None => true,
        }
    }

    /// True when the entry exists and is not a group header.
    pub fn is_buildable(&self, index: usize) -> bool {
        self.presets
            .get(index)
            .is_some_and(|p| !p.is_group_header)
    }

    /// A buildable preset that is currently shown.
    pub fn is_visible_leaf(&self, index: usize) -> bool {
        self.is_buildable(index) && self.is_visible(index)
    }

    pub fn visible_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.presets.len()).filter(|&i| self.is_visible(i))
    }

    // -----------------------------------------------------------------------

    fn max_index(&self) -> Option<i64> {
        (!self.presets.is_empty()).then(|| self.presets.len() as i64 - 1)
    }

    fn clamp_selection(&self) {
        let Some(max) = self.max_index() else {
            self.prefs.set_selection(0, 0);
            return;
        };
        let anchor = self.prefs.selected_index().clamp(0, max);
        let end = anchor
            .saturating_add(self.prefs.selection_range())
            .clamp(0, max);
        self.prefs.set_selection(anchor, end - anchor);
    }
}
