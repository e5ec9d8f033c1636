/// The animation-curve collaborator contract.
///
/// Curves hold ordered keyframe points with explicit Bézier handles;
/// the fade manager is their main client but tolerates curves it did
/// not create.
use serde::{Deserialize, Serialize};

use crate::{Frame, Strip};

/// Property a fade-purpose curve animates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveProp {
    Opacity,
    Volume,
}

impl CurveProp {
    /// The property a fade on this strip animates.
    pub fn for_strip(strip: &Strip) -> Self {
        if strip.is_sound() {
            Self::Volume
        } else {
            Self::Opacity
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: Frame,
    pub value: f64,

    /// Left Bézier handle as an absolute (frame, value) pair.
    pub handle_left: (f64, f64),

    /// Right Bézier handle as an absolute (frame, value) pair.
    pub handle_right: (f64, f64),
}

impl Keyframe {
    /// A point with handles collapsed onto it.
    pub fn new(frame: Frame, value: f64) -> Self {
        Self {
            frame,
            value,
            handle_left: (frame as f64, value),
            handle_right: (frame as f64, value),
        }
    }
}

/// An ordered keyframe curve with cubic Bézier interpolation between
/// neighbors and flat extrapolation outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub keyframes: Vec<Keyframe>,
}

impl Curve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    /// Insert a point, replacing any existing point on the same frame
    /// and keeping the list sorted.
    pub fn insert(&mut self, keyframe: Keyframe) {
        self.keyframes.retain(|k| k.frame != keyframe.frame);
        self.keyframes.push(keyframe);
        self.keyframes.sort_by_key(|k| k.frame);
    }

    pub fn remove(&mut self, frame: Frame) -> Option<Keyframe> {
        let idx = self.keyframes.iter().position(|k| k.frame == frame)?;
        Some(self.keyframes.remove(idx))
    }

    pub fn get(&self, frame: Frame) -> Option<&Keyframe> {
        self.keyframes.iter().find(|k| k.frame == frame)
    }

    /// Evaluate the curve at `frame`. Between two points this is a
    /// cubic Bézier over the value axis, with the outgoing handle of
    /// the left point and the incoming handle of the right point as
    /// control values; outside the keyframe range the nearest value
    /// holds flat. An empty curve evaluates to 0.
    pub fn evaluate(&self, frame: Frame) -> f64 {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return 0.0;
        };
        if frame <= first.frame {
            return first.value;
        }
        if frame >= last.frame {
            return last.value;
        }
        for pair in self.keyframes.windows(2) {
            let (k1, k2) = (&pair[0], &pair[1]);
            if frame == k1.frame {
                return k1.value;
            }
            if frame > k1.frame && frame < k2.frame {
                let t = (frame - k1.frame) as f64 / (k2.frame - k1.frame) as f64;
                return cubic_bezier(k1.value, k1.handle_right.1, k2.handle_left.1, k2.value, t);
            }
        }
        last.value
    }
}

fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;
    mt3 * p0 + 3.0 * mt2 * t * p1 + 3.0 * mt * t2 * p2 + t3 * p3
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CurveEntry {
    strip: String,
    property: CurveProp,
    curve: Curve,
}

/// All fade-purpose curves of a timeline, keyed by strip name and
/// property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveBank {
    entries: Vec<CurveEntry>,
}

impl CurveBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, strip: &str, property: CurveProp) -> Option<&Curve> {
        self.entries
            .iter()
            .find(|e| e.strip == strip && e.property == property)
            .map(|e| &e.curve)
    }

    pub fn get_mut(&mut self, strip: &str, property: CurveProp) -> Option<&mut Curve> {
        self.entries
            .iter_mut()
            .find(|e| e.strip == strip && e.property == property)
            .map(|e| &mut e.curve)
    }

    pub fn get_or_create(&mut self, strip: &str, property: CurveProp) -> &mut Curve {
        if let Some(idx) = self
            .entries
            .iter()
            .position(|e| e.strip == strip && e.property == property)
        {
            return &mut self.entries[idx].curve;
        }
        self.entries.push(CurveEntry {
            strip: strip.to_string(),
            property,
            curve: Curve::new(),
        });
        let idx = self.entries.len() - 1;
        &mut self.entries[idx].curve
    }

    pub fn remove(&mut self, strip: &str, property: CurveProp) -> Option<Curve> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.strip == strip && e.property == property)?;
        Some(self.entries.remove(idx).curve)
    }

    /// Drop the curve if it holds no keyframes.
    pub fn remove_if_empty(&mut self, strip: &str, property: CurveProp) {
        self.entries
            .retain(|e| !(e.strip == strip && e.property == property && e.curve.is_empty()));
    }

    /// Follow a strip rename so its curves stay attached.
    pub fn rename_strip(&mut self, old: &str, new: &str) {
        for e in &mut self.entries {
            if e.strip == old {
                e.strip = new.to_string();
            }
        }
    }

    /// Drop every curve owned by a deleted strip.
    pub fn remove_strip(&mut self, strip: &str) {
        self.entries.retain(|e| e.strip != strip);
    }
}
