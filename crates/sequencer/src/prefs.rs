use serde::{Deserialize, Serialize};

use crate::Frame;

/// Snapping configuration for interactive drags.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SnapSettings {
    /// Enable snapping of dragged edges.
    pub enabled: bool,

    /// Snap a dragged edge to the playhead cursor.
    pub to_cursor: bool,

    /// Snap a dragged edge to other strips' edges.
    pub to_edges: bool,

    /// Snap a dragged edge to timeline markers.
    pub to_markers: bool,

    /// Make the playhead cursor track a dragged edge's live frame.
    pub cursor_follow: bool,

    /// Snap tolerance in frames.
    pub tolerance: Frame,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            to_cursor: true,
            to_edges: true,
            to_markers: true,
            cursor_follow: false,
            tolerance: 5,
        }
    }
}

impl SnapSettings {
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }
}

/// Immutable per-call configuration passed into every engine operation.
/// Initialized once per session; engines never read ambient state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Prefs {
    /// Split unselected spanning strips too.
    pub cut_all: bool,

    /// Shift markers along with strips when rippling.
    pub ripple_markers: bool,

    /// A direct child's edge that coincides with the parent's dragged
    /// edge moves by the same delta.
    pub move_matching_edges: bool,

    /// Re-detect and re-set fades after a committed grab.
    pub auto_fade: bool,

    /// Fade length used when an operation needs one and none is given.
    pub default_fade_length: Frame,

    /// Deleting a strip clears its children's parent references.
    pub delete_clears_children: bool,

    pub snap: SnapSettings,
}

impl Default for Prefs {
    fn default() -> Self {
        Self {
            cut_all: false,
            ripple_markers: true,
            move_matching_edges: true,
            auto_fade: true,
            default_fade_length: 12,
            delete_clears_children: true,
            snap: SnapSettings::default(),
        }
    }
}
