/// Cut/split engine: split, trim, slide-trim, ripple-trim, uncut, and
/// rippling delete, with effect re-linking across cuts.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ripple, CurveBank, Frame, Prefs, SequencerError, Strip, StripKind, Timeline};

/// Which side of the cut an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    #[default]
    Both,
}

/// How a split treats the halves' content anchors. Soft keeps both
/// halves on the shared content clock so an uncut can merge them back
/// exactly; hard re-anchors the right half at the cut frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    #[default]
    Soft,
    Hard,
}

fn spans(s: &Strip, frame: Frame) -> bool {
    s.frame_final_start < frame && frame < s.frame_final_end
}

fn eligible(s: &Strip, frame: Frame, prefs: &Prefs) -> bool {
    !s.lock && !s.is_effect() && (s.any_select() || prefs.cut_all) && spans(s, frame)
}

/// Split every eligible spanning strip into two independent strips at
/// `frame`. `side` picks which halves keep the selection. Returns the
/// (left, right) name pairs.
pub fn split(
    timeline: &mut Timeline,
    frame: Frame,
    mode: SplitMode,
    side: Side,
    prefs: &Prefs,
) -> Vec<(String, String)> {
    let names: Vec<String> = timeline
        .strips
        .iter()
        .filter(|s| eligible(s, frame, prefs))
        .map(|s| s.name.clone())
        .collect();

    let mut pairs = Vec::new();
    for name in names {
        let Some(idx) = timeline.index_of(&name) else {
            continue;
        };
        let mut right = timeline.strips[idx].clone();
        {
            let left = &mut timeline.strips[idx];
            left.frame_final_end = frame;
            if side == Side::Right {
                left.deselect();
            }
        }
        right.frame_final_start = frame;
        if mode == SplitMode::Hard {
            right.frame_start = frame;
        }
        if side == Side::Left {
            right.deselect();
        }
        let right_name = timeline.add(right);
        relink_effects(timeline, &name, &right_name, frame);
        debug!(left = %name, right = %right_name, frame, "split");
        pairs.push((name, right_name));
    }
    pairs
}

/// After a split, dependent effects follow the halves: a one-input
/// effect spanning the cut is split alongside its input, an effect
/// fully on the right re-points to the right half, and a two-input
/// transition re-points to whichever half is exactly adjacent.
fn relink_effects(timeline: &mut Timeline, left_name: &str, right_name: &str, frame: Frame) {
    let Some(left) = timeline.get(left_name).cloned() else {
        return;
    };
    let Some(right) = timeline.get(right_name).cloned() else {
        return;
    };

    let dependents: Vec<String> = timeline
        .strips
        .iter()
        .filter(|s| s.kind.inputs().contains(&left_name))
        .map(|s| s.name.clone())
        .collect();

    for ename in dependents {
        let Some(idx) = timeline.index_of(&ename) else {
            continue;
        };
        let effect = timeline.strips[idx].clone();
        match &effect.kind {
            StripKind::Effect { effect: kind, .. } => {
                if spans(&effect, frame) {
                    let mut dup = effect.clone();
                    timeline.strips[idx].frame_final_end = frame;
                    dup.frame_final_start = frame;
                    dup.kind = StripKind::Effect {
                        input_1: right_name.to_string(),
                        effect: kind.clone(),
                    };
                    let dup_name = timeline.add(dup);
                    debug!(effect = %ename, duplicate = %dup_name, "effect split with its input");
                } else if effect.frame_final_start >= frame {
                    if let StripKind::Effect { input_1, .. } = &mut timeline.strips[idx].kind {
                        *input_1 = right_name.to_string();
                    }
                }
            }
            StripKind::Transition { .. } => {
                let touches = |h: &Strip| {
                    h.frame_final_end == effect.frame_final_start
                        || effect.frame_final_end == h.frame_final_start
                };
                let new_input = if touches(&right) {
                    Some(right_name)
                } else if touches(&left) {
                    Some(left_name)
                } else {
                    None
                };
                if let Some(new_input) = new_input {
                    if let StripKind::Transition { input_1, input_2, .. } =
                        &mut timeline.strips[idx].kind
                    {
                        if input_1 == left_name {
                            *input_1 = new_input.to_string();
                        }
                        if input_2 == left_name {
                            *input_2 = new_input.to_string();
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Split at `frame`, then ripple everything from the cut onward
/// forward by `gap`, opening a hole.
pub fn insert(
    timeline: &mut Timeline,
    frame: Frame,
    gap: Frame,
    prefs: &Prefs,
) -> Vec<(String, String)> {
    let pairs = split(timeline, frame, SplitMode::Soft, Side::Both, prefs);
    // Pivot just before the cut so the right halves, which start
    // exactly at the cut, ripple too.
    ripple(timeline, frame - 1, gap, prefs);
    pairs
}

fn apply_trim(
    timeline: &mut Timeline,
    frame: Frame,
    side: Side,
    prefs: &Prefs,
    slide: bool,
) -> Result<Vec<(String, Frame)>, SequencerError> {
    if side == Side::Both {
        return Err(SequencerError::InvalidOp(
            "trim requires a single side".into(),
        ));
    }
    let mut out = Vec::new();
    for s in timeline.strips.iter_mut() {
        if !eligible(s, frame, prefs) {
            continue;
        }
        let removed = match side {
            Side::Left => {
                let removed = frame - s.frame_final_start;
                if slide {
                    s.frame_start += removed;
                }
                s.frame_final_start = frame;
                removed
            }
            Side::Right => {
                let removed = s.frame_final_end - frame;
                if slide {
                    s.frame_start -= removed;
                }
                s.frame_final_end = frame;
                removed
            }
            Side::Both => unreachable!(),
        };
        out.push((s.name.clone(), removed));
    }
    Ok(out)
}

/// Truncate every eligible spanning strip's edge to the cut frame.
/// Strips fully on the kept side are unaffected.
pub fn trim(
    timeline: &mut Timeline,
    frame: Frame,
    side: Side,
    prefs: &Prefs,
) -> Result<Vec<String>, SequencerError> {
    let trimmed = apply_trim(timeline, frame, side, prefs, false)?;
    Ok(trimmed.into_iter().map(|(name, _)| name).collect())
}

/// Trim plus an anchor shift so the content at the untouched edge
/// keeps its source alignment.
pub fn slide_trim(
    timeline: &mut Timeline,
    frame: Frame,
    side: Side,
    prefs: &Prefs,
) -> Result<Vec<String>, SequencerError> {
    let trimmed = apply_trim(timeline, frame, side, prefs, true)?;
    Ok(trimmed.into_iter().map(|(name, _)| name).collect())
}

/// Trim, then ripple everything after the trimmed region back by the
/// largest trim length so mixed-length trims still produce one
/// consistent shift.
pub fn ripple_trim(
    timeline: &mut Timeline,
    frame: Frame,
    side: Side,
    prefs: &Prefs,
) -> Result<Vec<String>, SequencerError> {
    let trimmed = apply_trim(timeline, frame, side, prefs, false)?;
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let max_removed = trimmed.iter().map(|(_, r)| *r).max().unwrap_or(0);
    match side {
        Side::Right => {
            ripple(timeline, frame, -max_removed, prefs);
        }
        Side::Left => {
            // The gap sits before the trimmed strips; close it from
            // where the longest-trimmed strip used to start.
            ripple(timeline, frame - max_removed, -max_removed, prefs);
        }
        Side::Both => unreachable!(),
    }
    Ok(trimmed.into_iter().map(|(name, _)| name).collect())
}

/// Merge `name` with its exactly-adjacent neighbor(s) that share the
/// same source and content anchor, absorbing the neighbor's space.
/// Returns the absorbed strip names; differing sources never merge.
pub fn uncut(
    timeline: &mut Timeline,
    name: &str,
    side: Side,
) -> Result<Vec<String>, SequencerError> {
    if !timeline.contains(name) {
        return Err(SequencerError::StripNotFound(name.to_string()));
    }
    let sides: Vec<Side> = match side {
        Side::Both => vec![Side::Right, Side::Left],
        s => vec![s],
    };
    let mut absorbed = Vec::new();
    for s in sides {
        if let Some(gone) = merge_once(timeline, name, s) {
            absorbed.push(gone);
        }
    }
    Ok(absorbed)
}

fn merge_once(timeline: &mut Timeline, name: &str, side: Side) -> Option<String> {
    let strip = timeline.get(name)?.clone();
    let neighbor = timeline
        .strips
        .iter()
        .find(|n| {
            n.name != strip.name
                && !n.lock
                && n.channel == strip.channel
                && match side {
                    Side::Left => n.frame_final_end == strip.frame_final_start,
                    Side::Right => n.frame_final_start == strip.frame_final_end,
                    Side::Both => false,
                }
        })?
        .clone();

    if !strip.same_source(&neighbor) {
        return None;
    }
    // Single-frame image pairs merge regardless of anchor; everything
    // else needs the exact same content clock.
    let single_frame_images = matches!(strip.kind, StripKind::Image { .. })
        && strip.duration() == 1
        && neighbor.duration() == 1;
    if !single_frame_images && strip.frame_start != neighbor.frame_start {
        return None;
    }

    {
        let kept = timeline.get_mut(name)?;
        match side {
            Side::Left => kept.frame_final_start = neighbor.frame_final_start,
            Side::Right => kept.frame_final_end = neighbor.frame_final_end,
            Side::Both => {}
        }
    }
    timeline.remove(&neighbor.name);

    // References to the absorbed half follow the kept strip.
    for s in &mut timeline.strips {
        if s.parent.as_deref() == Some(neighbor.name.as_str()) {
            s.parent = Some(name.to_string());
        }
        match &mut s.kind {
            StripKind::Effect { input_1, .. } => {
                if input_1 == &neighbor.name {
                    *input_1 = name.to_string();
                }
            }
            StripKind::Transition {
                input_1, input_2, ..
            } => {
                if input_1 == &neighbor.name {
                    *input_1 = name.to_string();
                }
                if input_2 == &neighbor.name {
                    *input_2 = name.to_string();
                }
            }
            _ => {}
        }
    }
    debug!(kept = %name, absorbed = %neighbor.name, "uncut merged");
    Some(neighbor.name)
}

/// Delete every selected strip, cascading over dependent effects so no
/// effect is left with a dangling input. With `ripple_close`, the
/// deleted ranges are merged into contiguous holes and each hole is
/// ripple-closed by its own length, in ascending frame order. Returns
/// the deleted names.
pub fn delete_selected(
    timeline: &mut Timeline,
    curves: &mut CurveBank,
    ripple_close: bool,
    prefs: &Prefs,
) -> Vec<String> {
    let mut doomed: HashSet<String> = timeline
        .strips
        .iter()
        .filter(|s| s.any_select() && !s.lock)
        .map(|s| s.name.clone())
        .collect();
    if doomed.is_empty() {
        return Vec::new();
    }

    // Effects follow their inputs down; iterate because an effect can
    // feed another effect.
    loop {
        let mut grew = false;
        for s in &timeline.strips {
            if doomed.contains(&s.name) {
                continue;
            }
            if s.kind.inputs().iter().any(|i| doomed.contains(*i)) {
                doomed.insert(s.name.clone());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    let mut ranges: Vec<(Frame, Frame)> = timeline
        .strips
        .iter()
        .filter(|s| doomed.contains(&s.name))
        .map(|s| (s.frame_final_start, s.frame_final_end))
        .collect();

    timeline.strips.retain(|s| !doomed.contains(&s.name));
    for name in &doomed {
        curves.remove_strip(name);
    }

    if prefs.delete_clears_children {
        for s in &mut timeline.strips {
            if let Some(p) = s.parent.as_deref() {
                if doomed.contains(p) {
                    s.parent = None;
                }
            }
        }
    }

    if ripple_close {
        ranges.sort_unstable();
        let mut holes: Vec<(Frame, Frame)> = Vec::new();
        for (start, end) in ranges {
            match holes.last_mut() {
                Some((_, he)) if start <= *he => *he = (*he).max(end),
                _ => holes.push((start, end)),
            }
        }
        // Ascending order: each closure drags the later holes with it.
        let mut closed = 0;
        for (hs, he) in holes {
            let len = he - hs;
            ripple(timeline, hs - closed, -len, prefs);
            closed += len;
        }
    }

    let mut out: Vec<String> = doomed.into_iter().collect();
    out.sort();
    debug!(count = out.len(), ripple_close, "deleted strips");
    out
}
