/// Fade envelope management: two-keyframe fade-in/out shapes on the
/// opacity or volume curve of a strip, plus crossfade creation.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    closest_in_direction, first_free_channel, AdjacencyMode, Curve, CurveBank, CurveProp,
    Direction, Frame, Keyframe, SequencerError, Strip, StripKind, Timeline, TransitionKind,
};

/// Fraction of the fade length each Bézier handle reaches toward the
/// opposite point, giving a smooth ramp.
const HANDLE_FRACTION: f64 = 0.38;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    In,
    Out,
}

impl FadeDirection {
    fn boundary(&self, strip: &Strip) -> Frame {
        match self {
            Self::In => strip.frame_final_start,
            Self::Out => strip.frame_final_end,
        }
    }
}

fn normal_value(strip: &Strip) -> f64 {
    if strip.is_sound() {
        strip.volume
    } else {
        strip.opacity
    }
}

/// The conventional fade shape on `curve`: a low point of value 0
/// exactly on the boundary and a higher point toward the strip body.
/// Returns (low frame, high frame, high value), or None for anything
/// the manager should treat as "no usable fade."
fn established(
    curve: &Curve,
    boundary: Frame,
    direction: FadeDirection,
) -> Option<(Frame, Frame, f64)> {
    let low_idx = curve
        .keyframes
        .iter()
        .position(|k| k.frame == boundary && k.value.abs() < 1e-9)?;
    match direction {
        FadeDirection::In => {
            let high = curve.keyframes.get(low_idx + 1)?;
            (high.value > 0.0).then(|| (boundary, high.frame, high.value))
        }
        FadeDirection::Out => {
            if low_idx == 0 {
                return None;
            }
            let high = &curve.keyframes[low_idx - 1];
            (high.value > 0.0).then(|| (boundary, high.frame, high.value))
        }
    }
}

/// Length of the fade on `strip` in `direction`, or 0 when no
/// conventional fade shape is present (absent, single-point, or
/// malformed curves all read as "no fade").
pub fn detect_fade(curves: &CurveBank, strip: &Strip, direction: FadeDirection) -> Frame {
    let prop = CurveProp::for_strip(strip);
    let Some(curve) = curves.get(&strip.name, prop) else {
        return 0;
    };
    if curve.len() < 2 {
        return 0;
    }
    let boundary = direction.boundary(strip);
    match established(curve, boundary, direction) {
        Some((low, high, _)) => (high - low).abs(),
        None => 0,
    }
}

/// Write a fade of `length` frames on `strip` in `direction`,
/// creating, relocating, or repairing the two-point envelope as
/// needed. A zero length deletes the fade (and an emptied curve)
/// rather than leaving a degenerate pair.
pub fn set_fade(curves: &mut CurveBank, strip: &Strip, direction: FadeDirection, length: Frame) {
    let prop = CurveProp::for_strip(strip);
    let boundary = direction.boundary(strip);
    let length = length.clamp(0, strip.duration());

    if length == 0 {
        if let Some(curve) = curves.get_mut(&strip.name, prop) {
            if let Some((low, high, _)) = established(curve, boundary, direction) {
                curve.remove(low);
                curve.remove(high);
            }
        }
        curves.remove_if_empty(&strip.name, prop);
        return;
    }

    let high_frame = match direction {
        FadeDirection::In => boundary + length,
        FadeDirection::Out => boundary - length,
    };
    let fallback = normal_value(strip);
    let curve = curves.get_or_create(&strip.name, prop);

    let high_value = if curve.is_empty() {
        fallback
    } else if curve.len() == 1 {
        // A single point is ambiguous as a fade; its value becomes the
        // new high target.
        let value = curve.keyframes[0].value;
        curve.keyframes.clear();
        if value > 0.0 {
            value
        } else {
            fallback
        }
    } else if let Some((low, high, value)) = established(curve, boundary, direction) {
        curve.remove(low);
        curve.remove(high);
        value
    } else {
        // Malformed shape: repair around the curve's own evaluation at
        // the high point.
        debug!(strip = %strip.name, "repairing malformed fade curve");
        let value = curve.evaluate(high_frame);
        if value > 0.0 {
            value
        } else {
            fallback
        }
    };

    // Stray points strictly inside the fade span would fight the new
    // envelope.
    let (span_lo, span_hi) = (boundary.min(high_frame), boundary.max(high_frame));
    curve
        .keyframes
        .retain(|k| k.frame <= span_lo || k.frame >= span_hi);

    let handle = length as f64 * HANDLE_FRACTION;
    let mut low = Keyframe::new(boundary, 0.0);
    low.handle_left = (boundary as f64 - handle, 0.0);
    low.handle_right = (boundary as f64 + handle, 0.0);
    let mut high = Keyframe::new(high_frame, high_value);
    high.handle_left = (high_frame as f64 - handle, high_value);
    high.handle_right = (high_frame as f64 + handle, high_value);
    curve.insert(low);
    curve.insert(high);
}

/// Outcome of a crossfade attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossfadeOutcome {
    /// The created transition strip's name.
    Created(String),
    NoSecondStrip,
    NoOverlap,
}

/// Create a crossfade transition from `first_name` to the next strip.
///
/// The transition spans the overlap of the two strips on the first
/// free channel at or above the first strip's channel. With `smart`,
/// both strips' edges are first adjusted so the overlap equals
/// `length`, splitting the adjustment proportionally between the two
/// strips' available trim headroom (evenly when neither side is
/// headroom-constrained).
pub fn crossfade(
    timeline: &mut Timeline,
    first_name: &str,
    length: Frame,
    smart: bool,
) -> Result<CrossfadeOutcome, SequencerError> {
    let first = timeline
        .get(first_name)
        .ok_or_else(|| SequencerError::StripNotFound(first_name.to_string()))?
        .clone();
    if first.is_effect() {
        return Err(SequencerError::InvalidOp(
            "cannot crossfade from an effect strip".into(),
        ));
    }

    let Some(second) = closest_in_direction(
        &timeline.strips,
        &first,
        Direction::Next,
        AdjacencyMode::Any,
        first.is_sound(),
        false,
    ) else {
        return Ok(CrossfadeOutcome::NoSecondStrip);
    };
    let second_name = second.name.clone();

    if smart {
        adjust_overlap(timeline, first_name, &second_name, length);
    }

    let Some(first) = timeline.get(first_name).cloned() else {
        return Ok(CrossfadeOutcome::NoSecondStrip);
    };
    let Some(second) = timeline.get(&second_name).cloned() else {
        return Ok(CrossfadeOutcome::NoSecondStrip);
    };
    let (left, right) = (second.frame_final_start, first.frame_final_end);
    if right <= left {
        return Ok(CrossfadeOutcome::NoOverlap);
    }

    let channel = first_free_channel(&timeline.strips, left, right, first.channel, None);
    let mut transition = Strip::new(
        "crossfade",
        StripKind::Transition {
            input_1: first.name.clone(),
            input_2: second.name.clone(),
            transition: TransitionKind::Crossfade,
        },
        left,
        right,
        channel,
    );
    transition.frame_start = left;
    let name = timeline.add(transition);
    debug!(first = %first.name, second = %second.name, transition = %name, "crossfade created");
    Ok(CrossfadeOutcome::Created(name))
}

/// Grow (or shrink) the overlap between two strips toward `target`
/// frames, splitting the adjustment by available trim headroom.
fn adjust_overlap(timeline: &mut Timeline, first: &str, second: &str, target: Frame) {
    let Some(f) = timeline.get(first).cloned() else {
        return;
    };
    let Some(s) = timeline.get(second).cloned() else {
        return;
    };

    let overlap = f.frame_final_end - s.frame_final_start;
    let delta = target - overlap;
    if delta == 0 {
        return;
    }

    // Trailing headroom of the first strip and leading headroom of the
    // second; None means unconstrained source material.
    let head_first = f.media_end().map(|m| (m - f.frame_final_end).max(0));
    let head_second = match &s.kind {
        StripKind::Movie { .. } | StripKind::Sound { .. } => {
            Some((s.frame_final_start - s.frame_start).max(0))
        }
        _ => None,
    };

    let (d1, d2) = if delta > 0 {
        match (head_first, head_second) {
            (None, None) => (delta / 2, delta - delta / 2),
            (Some(h1), None) => {
                let d1 = (delta / 2).min(h1);
                (d1, delta - d1)
            }
            (None, Some(h2)) => {
                let d2 = (delta / 2).min(h2);
                (delta - d2, d2)
            }
            (Some(h1), Some(h2)) => {
                let total = h1 + h2;
                if total == 0 {
                    (0, 0)
                } else {
                    let d2 = (delta * h2 / total).min(h2);
                    let d1 = (delta - d2).min(h1);
                    (d1, d2)
                }
            }
        }
    } else {
        // Too much overlap already: pull both edges back evenly,
        // keeping at least one frame of body on each strip.
        let shrink = -delta;
        let s1 = (shrink / 2).min(f.duration() - 1);
        let s2 = (shrink - s1).min(s.duration() - 1);
        (-s1, -s2)
    };

    if let Some(strip) = timeline.get_mut(first) {
        strip.frame_final_end += d1;
    }
    if let Some(strip) = timeline.get_mut(second) {
        strip.frame_final_start -= d2;
    }
    debug!(first, second, d1, d2, "crossfade overlap adjusted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, Fps};

    fn movie(name: &str, start: Frame, end: Frame, channel: Channel) -> Strip {
        Strip::new(
            name,
            StripKind::Movie {
                path: "clips/a.mp4".into(),
                media_duration: 1000,
            },
            start,
            end,
            channel,
        )
    }

    #[test]
    fn fade_round_trips_through_detect() {
        let strip = movie("a", 0, 100, 1);
        let mut bank = CurveBank::new();
        for length in [0, 1, 12, 50, 100] {
            set_fade(&mut bank, &strip, FadeDirection::In, length);
            assert_eq!(detect_fade(&bank, &strip, FadeDirection::In), length);
            set_fade(&mut bank, &strip, FadeDirection::Out, length);
            assert_eq!(detect_fade(&bank, &strip, FadeDirection::Out), length);
        }
    }

    #[test]
    fn fade_length_clamps_to_duration() {
        let strip = movie("a", 0, 40, 1);
        let mut bank = CurveBank::new();
        set_fade(&mut bank, &strip, FadeDirection::In, 500);
        assert_eq!(detect_fade(&bank, &strip, FadeDirection::In), 40);
    }

    #[test]
    fn zero_length_deletes_the_envelope_and_curve() {
        let strip = movie("a", 0, 100, 1);
        let mut bank = CurveBank::new();
        set_fade(&mut bank, &strip, FadeDirection::In, 20);
        assert!(bank.get("a", CurveProp::Opacity).is_some());

        set_fade(&mut bank, &strip, FadeDirection::In, 0);
        assert!(bank.get("a", CurveProp::Opacity).is_none());
    }

    #[test]
    fn single_point_becomes_the_high_target() {
        let strip = movie("a", 0, 100, 1);
        let mut bank = CurveBank::new();
        bank.get_or_create("a", CurveProp::Opacity)
            .insert(Keyframe::new(50, 0.6));
        // Ambiguous single point reads as no fade.
        assert_eq!(detect_fade(&bank, &strip, FadeDirection::In), 0);

        set_fade(&mut bank, &strip, FadeDirection::In, 10);
        let curve = bank.get("a", CurveProp::Opacity).unwrap();
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.get(10).unwrap().value, 0.6);
        assert_eq!(detect_fade(&bank, &strip, FadeDirection::In), 10);
    }

    #[test]
    fn malformed_shape_is_repaired() {
        let strip = movie("a", 0, 100, 1);
        let mut bank = CurveBank::new();
        // Low point nowhere near the boundary.
        let curve = bank.get_or_create("a", CurveProp::Opacity);
        curve.insert(Keyframe::new(30, 0.0));
        curve.insert(Keyframe::new(60, 0.9));
        assert_eq!(detect_fade(&bank, &strip, FadeDirection::In), 0);

        set_fade(&mut bank, &strip, FadeDirection::In, 20);
        assert_eq!(detect_fade(&bank, &strip, FadeDirection::In), 20);
    }

    #[test]
    fn stray_points_inside_the_span_are_removed() {
        let strip = movie("a", 0, 100, 1);
        let mut bank = CurveBank::new();
        set_fade(&mut bank, &strip, FadeDirection::In, 30);
        bank.get_mut("a", CurveProp::Opacity)
            .unwrap()
            .insert(Keyframe::new(15, 0.2));

        set_fade(&mut bank, &strip, FadeDirection::In, 30);
        let curve = bank.get("a", CurveProp::Opacity).unwrap();
        assert!(curve.get(15).is_none());
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn fade_follows_a_moved_boundary() {
        let mut strip = movie("a", 0, 100, 1);
        let mut bank = CurveBank::new();
        set_fade(&mut bank, &strip, FadeDirection::In, 10);

        // Resize the strip, then re-set the fade at the new boundary.
        strip.frame_final_start = 20;
        set_fade(&mut bank, &strip, FadeDirection::In, 10);
        let curve = bank.get("a", CurveProp::Opacity).unwrap();
        assert!(curve.get(20).is_some());
        assert!(curve.get(30).is_some());
        assert_eq!(detect_fade(&bank, &strip, FadeDirection::In), 10);
    }

    #[test]
    fn smart_crossfade_overlaps_by_target_length() {
        let mut timeline = Timeline::new(Fps::default());
        let mut a = movie("a", 0, 100, 1);
        a.frame_start = 0;
        let mut b = movie("b", 100, 200, 1);
        b.frame_start = 100;
        timeline.add(a);
        timeline.add(b);

        let outcome = crossfade(&mut timeline, "a", 20, true).unwrap();
        let CrossfadeOutcome::Created(name) = outcome else {
            panic!("expected a transition");
        };

        let a = timeline.get("a").unwrap();
        let b = timeline.get("b").unwrap();
        assert_eq!(a.frame_final_end - b.frame_final_start, 20);

        let t = timeline.get(&name).unwrap();
        assert_eq!(t.frame_final_start, b.frame_final_start);
        assert_eq!(t.frame_final_end, a.frame_final_end);
        assert!(t.channel > 1);
        assert!(t.is_effect());
    }

    #[test]
    fn smart_crossfade_splits_by_headroom() {
        let mut timeline = Timeline::new(Fps::default());
        // b has 50 frames of leading headroom; a has plenty trailing.
        let a = movie("a", 0, 100, 1);
        let mut b = movie("b", 100, 200, 1);
        b.frame_start = 50;
        timeline.add(a);
        timeline.add(b);

        crossfade(&mut timeline, "a", 20, true).unwrap();
        let a = timeline.get("a").unwrap();
        let b = timeline.get("b").unwrap();
        assert_eq!(a.frame_final_end - b.frame_final_start, 20);
        // Neither edge moved past its media.
        assert!(b.frame_final_start >= b.frame_start);
    }

    #[test]
    fn crossfade_without_second_strip_warns() {
        let mut timeline = Timeline::new(Fps::default());
        timeline.add(movie("a", 0, 100, 1));
        assert_eq!(
            crossfade(&mut timeline, "a", 20, false).unwrap(),
            CrossfadeOutcome::NoSecondStrip
        );
    }
}
