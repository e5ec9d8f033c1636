use serde::{Deserialize, Serialize};

use crate::{Channel, Frame};

/// Built-in single-input effect variants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    ColorBalance,
    GaussianBlur,
    Glow,
    Transform,
    Custom(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Crossfade,
    Wipe,
    GammaCross,
    Custom(String),
}

impl Default for TransitionKind {
    fn default() -> Self {
        Self::Crossfade
    }
}

/// Closed tag discriminating strip behavior. Source variants carry the
/// fields the uncut source-match rules compare; effect variants carry
/// weak name references to the strips they composite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StripKind {
    Movie {
        path: String,
        media_duration: Frame,
    },
    Sound {
        path: String,
        media_duration: Frame,
    },
    Image {
        directory: String,
        filename: String,
    },
    Scene {
        scene: String,
    },
    Effect {
        input_1: String,
        effect: EffectKind,
    },
    Transition {
        input_1: String,
        input_2: String,
        #[serde(default)]
        transition: TransitionKind,
    },
    Meta,
}

impl StripKind {
    pub fn is_effect(&self) -> bool {
        matches!(self, Self::Effect { .. } | Self::Transition { .. })
    }

    pub fn is_sound(&self) -> bool {
        matches!(self, Self::Sound { .. })
    }

    /// Name references this strip composites, in input order.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Self::Effect { input_1, .. } => vec![input_1.as_str()],
            Self::Transition {
                input_1, input_2, ..
            } => vec![input_1.as_str(), input_2.as_str()],
            _ => Vec::new(),
        }
    }
}

/// Annotation record. An offset makes the tag a marker relative to the
/// strip start, so it travels with the strip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub label: String,
    #[serde(default)]
    pub offset: Option<Frame>,
    #[serde(default)]
    pub length: Frame,
    #[serde(default = "default_tag_color")]
    pub color: String,
}

fn default_tag_color() -> String {
    "#4A9EFF".to_string()
}

fn default_level() -> f64 {
    1.0
}

/// A single timed interval placed on a channel.
///
/// `frame_start` anchors the source content (where frame 0 of the
/// source lands); `frame_final_start..frame_final_end` is the visible
/// half-open interval. The name is the only identity a strip has, and
/// the only foreign-key mechanism (`parent`, effect inputs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Strip {
    pub name: String,
    pub frame_start: Frame,
    pub frame_final_start: Frame,
    pub frame_final_end: Frame,
    pub channel: Channel,
    #[serde(default)]
    pub select: bool,
    #[serde(default)]
    pub select_left_handle: bool,
    #[serde(default)]
    pub select_right_handle: bool,
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(flatten)]
    pub kind: StripKind,
    #[serde(default = "default_level")]
    pub opacity: f64,
    #[serde(default = "default_level")]
    pub volume: f64,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Strip {
    pub fn new(
        name: impl Into<String>,
        kind: StripKind,
        start: Frame,
        end: Frame,
        channel: Channel,
    ) -> Self {
        Self {
            name: name.into(),
            frame_start: start,
            frame_final_start: start,
            frame_final_end: end,
            channel,
            select: false,
            select_left_handle: false,
            select_right_handle: false,
            lock: false,
            mute: false,
            parent: None,
            kind,
            opacity: 1.0,
            volume: 1.0,
            tags: Vec::new(),
        }
    }

    pub fn duration(&self) -> Frame {
        self.frame_final_end - self.frame_final_start
    }

    pub fn is_effect(&self) -> bool {
        self.kind.is_effect()
    }

    pub fn is_sound(&self) -> bool {
        self.kind.is_sound()
    }

    /// True when any part of the strip is selected, body or handle.
    pub fn any_select(&self) -> bool {
        self.select || self.select_left_handle || self.select_right_handle
    }

    pub fn deselect(&mut self) {
        self.select = false;
        self.select_left_handle = false;
        self.select_right_handle = false;
    }

    /// Last source frame available to the right of the visible end, for
    /// strips backed by finite media.
    pub fn media_end(&self) -> Option<Frame> {
        match &self.kind {
            StripKind::Movie { media_duration, .. } | StripKind::Sound { media_duration, .. } => {
                Some(self.frame_start + media_duration)
            }
            _ => None,
        }
    }

    pub fn range_overlaps(&self, left: Frame, right: Frame) -> bool {
        self.frame_final_start < right && left < self.frame_final_end
    }

    pub fn overlaps(&self, other: &Strip) -> bool {
        self.channel == other.channel
            && self.range_overlaps(other.frame_final_start, other.frame_final_end)
    }

    /// Shift the anchor and both visible edges by `offset`.
    pub fn translate(&mut self, offset: Frame) {
        self.frame_start += offset;
        self.frame_final_start += offset;
        self.frame_final_end += offset;
    }

    /// Source identity comparison for uncut. Type-specific: movie and
    /// sound compare the file path, scenes compare the referenced
    /// scene, images compare directory plus filename. Anything else
    /// never matches.
    pub fn same_source(&self, other: &Strip) -> bool {
        match (&self.kind, &other.kind) {
            (StripKind::Movie { path: a, .. }, StripKind::Movie { path: b, .. }) => a == b,
            (StripKind::Sound { path: a, .. }, StripKind::Sound { path: b, .. }) => a == b,
            (
                StripKind::Image {
                    directory: da,
                    filename: fa,
                },
                StripKind::Image {
                    directory: db,
                    filename: fb,
                },
            ) => da == db && fa == fb,
            (StripKind::Scene { scene: a }, StripKind::Scene { scene: b }) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(name: &str, start: Frame, end: Frame, channel: Channel) -> Strip {
        Strip::new(
            name,
            StripKind::Movie {
                path: "clips/a.mp4".into(),
                media_duration: 300,
            },
            start,
            end,
            channel,
        )
    }

    #[test]
    fn overlap_is_half_open() {
        let a = movie("a", 0, 100, 1);
        let b = movie("b", 100, 200, 1);
        assert!(!a.overlaps(&b));

        let c = movie("c", 99, 200, 1);
        assert!(a.overlaps(&c));

        let d = movie("d", 50, 60, 2);
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn translate_moves_anchor_and_edges() {
        let mut a = movie("a", 10, 50, 1);
        a.translate(-10);
        assert_eq!(a.frame_start, 0);
        assert_eq!(a.frame_final_start, 0);
        assert_eq!(a.frame_final_end, 40);
    }

    #[test]
    fn source_match_is_type_specific() {
        let a = movie("a", 0, 100, 1);
        let mut b = movie("b", 100, 200, 1);
        assert!(a.same_source(&b));

        b.kind = StripKind::Movie {
            path: "clips/other.mp4".into(),
            media_duration: 300,
        };
        assert!(!a.same_source(&b));

        let img = Strip::new(
            "i",
            StripKind::Image {
                directory: "stills".into(),
                filename: "a.png".into(),
            },
            0,
            100,
            1,
        );
        assert!(!a.same_source(&img));
    }

    #[test]
    fn media_end_only_for_finite_media() {
        let a = movie("a", 10, 50, 1);
        assert_eq!(a.media_end(), Some(310));

        let img = Strip::new(
            "i",
            StripKind::Image {
                directory: "stills".into(),
                filename: "a.png".into(),
            },
            0,
            100,
            1,
        );
        assert_eq!(img.media_end(), None);
    }
}
