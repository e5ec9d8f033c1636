/// Ripple engine: shift everything past a pivot by a signed offset.
use std::collections::VecDeque;

use tracing::debug;

use crate::{area_filled, first_free_channel, Frame, Prefs, Timeline};

/// Shift every non-locked, non-effect strip past the pivot by
/// `offset`, probing channels upward on collision. Markers follow the
/// same rule when `prefs.ripple_markers` is set. Returns the names of
/// the shifted strips.
///
/// A strip qualifies when its end lies beyond `pivot - offset` AND its
/// start is strictly after the pivot; the double condition keeps
/// strips that merely extend past the pivot from being dragged along.
pub fn ripple(timeline: &mut Timeline, pivot: Frame, offset: Frame, prefs: &Prefs) -> Vec<String> {
    if offset == 0 {
        return Vec::new();
    }

    let targets: Vec<usize> = timeline
        .strips
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.lock && !s.is_effect())
        .filter(|(_, s)| s.frame_final_end > pivot - offset && s.frame_final_start > pivot)
        .map(|(i, _)| i)
        .collect();

    for &i in &targets {
        timeline.strips[i].translate(offset);
    }

    // Collision resolution iterates to a fixed point: relocating one
    // strip can expose a collision for one already processed, so a
    // strip whose shift still collides goes back on the queue.
    let mut queue: VecDeque<usize> = targets.iter().copied().collect();
    while let Some(i) = queue.pop_front() {
        let (left, right, channel, name) = {
            let s = &timeline.strips[i];
            (
                s.frame_final_start,
                s.frame_final_end,
                s.channel,
                s.name.clone(),
            )
        };
        if area_filled(&timeline.strips, left, right, channel, channel, Some(&name)) {
            let free = first_free_channel(&timeline.strips, left, right, channel, Some(&name));
            debug!(strip = %name, from = channel, to = free, "ripple collision, probing up");
            timeline.strips[i].channel = free;
            queue.push_back(i);
        }
    }

    if prefs.ripple_markers {
        for m in timeline.markers.iter_mut() {
            if m.frame > pivot - offset && m.frame > pivot {
                m.frame += offset;
            }
        }
    }

    let moved: Vec<String> = targets
        .iter()
        .map(|&i| timeline.strips[i].name.clone())
        .collect();
    debug!(pivot, offset, count = moved.len(), "ripple applied");
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, Fps, Marker, Strip, StripKind};

    fn strip(name: &str, start: Frame, end: Frame, channel: Channel) -> Strip {
        Strip::new(name, StripKind::Meta, start, end, channel)
    }

    fn timeline(strips: Vec<Strip>) -> Timeline {
        let mut tl = Timeline::new(Fps::default());
        for s in strips {
            tl.add(s);
        }
        tl
    }

    #[test]
    fn ripple_conserves_frame_deltas() {
        let mut tl = timeline(vec![
            strip("a", 0, 100, 1),
            strip("b", 150, 250, 1),
            strip("c", 300, 400, 2),
        ]);
        let moved = ripple(&mut tl, 100, 50, &Prefs::default());
        assert_eq!(moved.len(), 2);
        assert_eq!(tl.get("a").unwrap().frame_final_start, 0);
        assert_eq!(tl.get("b").unwrap().frame_final_start, 200);
        assert_eq!(tl.get("c").unwrap().frame_final_start, 350);
    }

    #[test]
    fn spanning_strips_stay_put() {
        // d extends past the pivot but does not start after it.
        let mut tl = timeline(vec![strip("d", 50, 300, 1), strip("e", 310, 400, 1)]);
        ripple(&mut tl, 100, 20, &Prefs::default());
        assert_eq!(tl.get("d").unwrap().frame_final_start, 50);
        assert_eq!(tl.get("e").unwrap().frame_final_start, 330);
    }

    #[test]
    fn collision_probes_channels_upward() {
        // Closing a gap pushes b onto the long strip in channel 1.
        let mut tl = timeline(vec![strip("long", 0, 200, 1), strip("b", 250, 400, 1)]);
        ripple(&mut tl, 200, -100, &Prefs::default());
        let b = tl.get("b").unwrap();
        assert_eq!(b.frame_final_start, 150);
        assert_eq!(b.channel, 2);
    }

    #[test]
    fn locked_and_effect_strips_are_excluded() {
        let mut locked = strip("locked", 200, 300, 1);
        locked.lock = true;
        let effect = Strip::new(
            "fx",
            StripKind::Effect {
                input_1: "locked".into(),
                effect: crate::EffectKind::GaussianBlur,
            },
            200,
            300,
            2,
        );
        let mut tl = timeline(vec![locked, effect]);
        ripple(&mut tl, 100, 50, &Prefs::default());
        assert_eq!(tl.get("locked").unwrap().frame_final_start, 200);
        assert_eq!(tl.get("fx").unwrap().frame_final_start, 200);
    }

    #[test]
    fn markers_follow_when_enabled() {
        let mut tl = timeline(vec![strip("a", 200, 300, 1)]);
        tl.markers.add_marker(Marker::new(250, "after"));
        tl.markers.add_marker(Marker::new(50, "before"));

        ripple(&mut tl, 100, 25, &Prefs::default());
        assert_eq!(tl.markers.nearest_marker(300).unwrap().frame, 275);
        assert_eq!(tl.markers.nearest_marker(0).unwrap().frame, 50);

        let prefs = Prefs {
            ripple_markers: false,
            ..Prefs::default()
        };
        let mut tl = timeline(vec![strip("a", 200, 300, 1)]);
        tl.markers.add_marker(Marker::new(250, "after"));
        ripple(&mut tl, 100, 25, &prefs);
        assert_eq!(tl.markers.nearest_marker(0).unwrap().frame, 250);
    }

    #[test]
    fn zero_offset_is_a_no_op() {
        let mut tl = timeline(vec![strip("a", 200, 300, 1)]);
        assert!(ripple(&mut tl, 0, 0, &Prefs::default()).is_empty());
    }
}
