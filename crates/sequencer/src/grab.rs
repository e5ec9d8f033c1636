/// Grab/transform engine: the interactive move/resize state machine.
///
/// A drag is a sequence of discrete ticks. Every tick recomputes
/// absolute positions from the immutable snapshot captured at drag
/// start, never from the previous tick's output, so nothing drifts or
/// compounds.
use tracing::debug;

use crate::{
    area_filled, detect_fade, first_free_channel, recursive_descendants, set_fade,
    timeline_extent, Channel, CurveBank, FadeDirection, Frame, Prefs, SequencerError, Strip,
    StripKind, Timeline,
};

/// Position and selection state of one strip at drag start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripSnapshot {
    pub name: String,
    pub frame_start: Frame,
    pub frame_final_start: Frame,
    pub frame_final_end: Frame,
    pub channel: Channel,
    pub select: bool,
    pub select_left_handle: bool,
    pub select_right_handle: bool,
}

impl StripSnapshot {
    pub fn capture(strip: &Strip) -> Self {
        Self {
            name: strip.name.clone(),
            frame_start: strip.frame_start,
            frame_final_start: strip.frame_final_start,
            frame_final_end: strip.frame_final_end,
            channel: strip.channel,
            select: strip.select,
            select_left_handle: strip.select_left_handle,
            select_right_handle: strip.select_right_handle,
        }
    }

    fn body_only(&self) -> bool {
        self.select && !self.select_left_handle && !self.select_right_handle
    }

    fn restore(&self, strip: &mut Strip) {
        strip.frame_start = self.frame_start;
        strip.frame_final_start = self.frame_final_start;
        strip.frame_final_end = self.frame_final_end;
        strip.channel = self.channel;
    }

    fn at_snapshot(&self, strip: &Strip) -> bool {
        strip.frame_start == self.frame_start
            && strip.frame_final_start == self.frame_final_start
            && strip.frame_final_end == self.frame_final_end
            && strip.channel == self.channel
    }
}

/// Which part of the target strip drives the per-tick offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabTarget {
    Body,
    LeftHandle,
    RightHandle,
}

/// Accumulated input state for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GrabInput {
    /// Horizontal offset in frames since drag start.
    pub dx: Frame,

    /// Vertical offset in channels since drag start (positive = up).
    pub dy: i64,

    pub ripple: bool,
    pub ripple_pop: bool,
}

#[derive(Debug, Clone)]
struct ChildLink {
    snap: StripSnapshot,

    /// The grabbed ancestor whose motion this child follows.
    root: String,

    /// Direct child of the root; only direct children inherit edge
    /// motion.
    direct: bool,
    matches_left: bool,
    matches_right: bool,
}

#[derive(Debug, Clone)]
struct FadeRecord {
    name: String,
    fade_in: Frame,
    fade_out: Frame,
}

/// Live state of one interactive grab, from begin to commit/cancel.
#[derive(Debug, Clone)]
pub struct GrabSession {
    target_name: String,
    target: GrabTarget,
    grabbed: Vec<StripSnapshot>,
    children: Vec<ChildLink>,
    bystanders: Vec<StripSnapshot>,
    fades: Vec<FadeRecord>,
    cursor_origin: Frame,
    overlay_origin: Option<Frame>,
    input: GrabInput,
    ripple_offset: Frame,
}

impl GrabSession {
    /// Capture the starting snapshot for every participant. Fails only
    /// when nothing movable is selected.
    pub fn begin(timeline: &Timeline, curves: &CurveBank) -> Result<Self, SequencerError> {
        let grabbed: Vec<StripSnapshot> = timeline
            .strips
            .iter()
            .filter(|s| s.any_select() && !s.lock && !s.is_effect())
            .map(StripSnapshot::capture)
            .collect();
        if grabbed.is_empty() {
            return Err(SequencerError::NothingSelected);
        }

        // Target priority: a body-selected strip with no edge handles,
        // else a right-handle strip, else a left-handle strip.
        let (target_name, target) = if let Some(s) = grabbed.iter().find(|s| s.body_only()) {
            (s.name.clone(), GrabTarget::Body)
        } else if let Some(s) = grabbed.iter().find(|s| s.select_right_handle) {
            (s.name.clone(), GrabTarget::RightHandle)
        } else if let Some(s) = grabbed.iter().find(|s| s.select_left_handle) {
            (s.name.clone(), GrabTarget::LeftHandle)
        } else {
            let s = &grabbed[0];
            (s.name.clone(), GrabTarget::Body)
        };

        let target_snap = grabbed
            .iter()
            .find(|s| s.name == target_name)
            .unwrap_or(&grabbed[0]);
        let ripple_boundary = match target {
            GrabTarget::LeftHandle => target_snap.frame_final_start,
            _ => target_snap.frame_final_end,
        };

        let mut children = Vec::new();
        for root in &grabbed {
            for d in recursive_descendants(&timeline.strips, &root.name) {
                if grabbed.iter().any(|g| g.name == d.name)
                    || children
                        .iter()
                        .any(|c: &ChildLink| c.snap.name == d.name)
                {
                    continue;
                }
                let direct = d.parent.as_deref() == Some(root.name.as_str());
                children.push(ChildLink {
                    matches_left: d.frame_final_start == root.frame_final_start,
                    matches_right: d.frame_final_end == root.frame_final_end,
                    snap: StripSnapshot::capture(d),
                    root: root.name.clone(),
                    direct,
                });
            }
        }

        let bystanders: Vec<StripSnapshot> = timeline
            .strips
            .iter()
            .filter(|s| !s.any_select() && !s.lock && !s.is_effect())
            .filter(|s| !children.iter().any(|c| c.snap.name == s.name))
            .filter(|s| s.frame_final_start >= ripple_boundary)
            .map(StripSnapshot::capture)
            .collect();

        let fades = grabbed
            .iter()
            .filter_map(|snap| {
                let strip = timeline.get(&snap.name)?;
                Some(FadeRecord {
                    name: snap.name.clone(),
                    fade_in: detect_fade(curves, strip, FadeDirection::In),
                    fade_out: detect_fade(curves, strip, FadeDirection::Out),
                })
            })
            .collect();

        debug!(
            strip = %target_name,
            grabbed = grabbed.len(),
            children = children.len(),
            bystanders = bystanders.len(),
            "grab begun"
        );
        Ok(Self {
            target_name,
            target,
            grabbed,
            children,
            bystanders,
            fades,
            cursor_origin: timeline.cursor,
            overlay_origin: timeline.overlay_frame,
            input: GrabInput::default(),
            ripple_offset: 0,
        })
    }

    pub fn target(&self) -> (GrabTarget, &str) {
        (self.target, &self.target_name)
    }

    pub fn grabbed(&self) -> &[StripSnapshot] {
        &self.grabbed
    }

    pub fn input(&self) -> GrabInput {
        self.input
    }

    /// One input event: recompute every participant's absolute
    /// position from the snapshot plus the accumulated input.
    pub fn tick(&mut self, timeline: &mut Timeline, input: GrabInput, prefs: &Prefs) {
        self.input = input;
        self.apply(timeline, prefs);
    }

    fn apply(&mut self, timeline: &mut Timeline, prefs: &Prefs) {
        let input = self.input;
        let mut moved_bodies: Vec<String> = Vec::new();

        // Grabbed strips first; later phases read their live state.
        for snap in &self.grabbed {
            let Some(strip) = timeline.get_mut(&snap.name) else {
                continue;
            };
            if snap.body_only() {
                strip.frame_start = snap.frame_start + input.dx;
                strip.frame_final_start = snap.frame_final_start + input.dx;
                strip.frame_final_end = snap.frame_final_end + input.dx;
                strip.channel = (snap.channel + input.dy).max(1);
                moved_bodies.push(snap.name.clone());
            } else {
                resize_from(
                    strip,
                    snap,
                    snap.select_left_handle.then_some(input.dx),
                    snap.select_right_handle.then_some(input.dx),
                );
            }
        }

        // The ripple offset follows how far the rippling edge actually
        // moved, clamps included, not the raw pointer delta.
        self.ripple_offset = if input.ripple {
            self.edge_offset(timeline)
        } else {
            0
        };

        self.apply_children(timeline, prefs, &mut moved_bodies);
        self.apply_bystanders(timeline);

        // Channel collisions for every translated strip; handle-only
        // resizes never change lanes.
        for name in &moved_bodies {
            let Some(idx) = timeline.index_of(name) else {
                continue;
            };
            let (left, right, channel) = {
                let s = &timeline.strips[idx];
                (s.frame_final_start, s.frame_final_end, s.channel)
            };
            if area_filled(&timeline.strips, left, right, channel, channel, Some(name)) {
                let free = first_free_channel(&timeline.strips, left, right, channel, Some(name));
                timeline.strips[idx].channel = free;
            }
        }

        self.track_cursor(timeline, prefs);
    }

    /// How far the rippling edge of the target strip actually moved
    /// from its snapshot.
    fn edge_offset(&self, timeline: &Timeline) -> Frame {
        let Some(snap) = self.grabbed.iter().find(|s| s.name == self.target_name) else {
            return 0;
        };
        let Some(live) = timeline.get(&self.target_name) else {
            return 0;
        };
        match self.target {
            GrabTarget::Body => live.frame_start - snap.frame_start,
            GrabTarget::RightHandle => live.frame_final_end - snap.frame_final_end,
            GrabTarget::LeftHandle => live.frame_final_start - snap.frame_final_start,
        }
    }

    fn apply_children(&self, timeline: &mut Timeline, prefs: &Prefs, moved_bodies: &mut Vec<String>) {
        for link in &self.children {
            let Some(root_snap) = self.grabbed.iter().find(|g| g.name == link.root) else {
                continue;
            };
            let Some(root_live) = timeline.get(&link.root) else {
                continue;
            };
            let body_dx = root_live.frame_start - root_snap.frame_start;
            let body_dy = root_live.channel - root_snap.channel;
            let left_delta = root_live.frame_final_start - root_snap.frame_final_start;
            let right_delta = root_live.frame_final_end - root_snap.frame_final_end;
            let root_is_body = root_snap.body_only();

            let snap = &link.snap;
            let Some(strip) = timeline.get_mut(&snap.name) else {
                continue;
            };
            if root_is_body || !link.direct {
                // Translation by the root's net position delta; for
                // grandchildren this is the only motion that ever
                // propagates.
                strip.frame_start = snap.frame_start + body_dx;
                strip.frame_final_start = snap.frame_final_start + body_dx;
                strip.frame_final_end = snap.frame_final_end + body_dx;
                strip.channel = (snap.channel + body_dy).max(1);
                if body_dx != 0 || body_dy != 0 {
                    moved_bodies.push(snap.name.clone());
                }
            } else {
                // Direct child of a handle-dragged parent: matching
                // edges follow the parent's edge when configured.
                let left = (prefs.move_matching_edges
                    && root_snap.select_left_handle
                    && link.matches_left)
                    .then_some(left_delta);
                let right = (prefs.move_matching_edges
                    && root_snap.select_right_handle
                    && link.matches_right)
                    .then_some(right_delta);
                resize_from(strip, snap, left, right);
            }
        }
    }

    fn apply_bystanders(&self, timeline: &mut Timeline) {
        let shift = self.input.ripple && !self.input.ripple_pop;
        for snap in &self.bystanders {
            let Some(idx) = timeline.index_of(&snap.name) else {
                continue;
            };
            if shift {
                let strip = &mut timeline.strips[idx];
                strip.frame_start = snap.frame_start + self.ripple_offset;
                strip.frame_final_start = snap.frame_final_start + self.ripple_offset;
                strip.frame_final_end = snap.frame_final_end + self.ripple_offset;
                strip.channel = snap.channel;
                let (left, right, channel) = (
                    strip.frame_final_start,
                    strip.frame_final_end,
                    strip.channel,
                );
                if area_filled(
                    &timeline.strips,
                    left,
                    right,
                    channel,
                    channel,
                    Some(&snap.name),
                ) {
                    let free = first_free_channel(
                        &timeline.strips,
                        left,
                        right,
                        channel,
                        Some(&snap.name),
                    );
                    timeline.strips[idx].channel = free;
                }
            } else {
                // Ripple turned off (or pop mode): place each
                // bystander back on its snapshot as soon as the slot
                // is free; an occupied slot is retried next tick.
                if snap.at_snapshot(&timeline.strips[idx]) {
                    continue;
                }
                if !area_filled(
                    &timeline.strips,
                    snap.frame_final_start,
                    snap.frame_final_end,
                    snap.channel,
                    snap.channel,
                    Some(&snap.name),
                ) {
                    snap.restore(&mut timeline.strips[idx]);
                }
            }
        }
    }

    /// Display-only cursor tracking: the playhead follows the dragged
    /// edge, and a second selected edge is mirrored through the
    /// overlay reference frame.
    fn track_cursor(&self, timeline: &mut Timeline, prefs: &Prefs) {
        if !prefs.snap.cursor_follow || self.target == GrabTarget::Body {
            return;
        }
        let Some(live) = timeline.get(&self.target_name) else {
            return;
        };
        let edge = match self.target {
            GrabTarget::LeftHandle => live.frame_final_start,
            _ => live.frame_final_end,
        };

        let mut second: Option<Frame> = None;
        'outer: for snap in &self.grabbed {
            for left_edge in [true, false] {
                let selected = if left_edge {
                    snap.select_left_handle
                } else {
                    snap.select_right_handle
                };
                if !selected {
                    continue;
                }
                let is_target = snap.name == self.target_name
                    && ((left_edge && self.target == GrabTarget::LeftHandle)
                        || (!left_edge && self.target == GrabTarget::RightHandle));
                if is_target {
                    continue;
                }
                if let Some(other) = timeline.get(&snap.name) {
                    second = Some(if left_edge {
                        other.frame_final_start
                    } else {
                        other.frame_final_end
                    });
                    break 'outer;
                }
            }
        }

        timeline.cursor = edge;
        if second.is_some() {
            timeline.overlay_frame = second;
        }
    }

    /// Confirm the drag: one final re-apply, then fade upkeep for
    /// strips whose edges actually moved, then display state restore.
    pub fn commit(&mut self, timeline: &mut Timeline, curves: &mut CurveBank, prefs: &Prefs) {
        self.apply(timeline, prefs);

        if prefs.auto_fade {
            for record in &self.fades {
                let Some(snap) = self.grabbed.iter().find(|g| g.name == record.name) else {
                    continue;
                };
                let Some(strip) = timeline.get(&record.name).cloned() else {
                    continue;
                };
                if record.fade_in > 0 && strip.frame_final_start != snap.frame_final_start {
                    set_fade(curves, &strip, FadeDirection::In, record.fade_in);
                }
                if record.fade_out > 0 && strip.frame_final_end != snap.frame_final_end {
                    set_fade(curves, &strip, FadeDirection::Out, record.fade_out);
                }
            }
        }

        timeline.cursor = self.cursor_origin;
        timeline.overlay_frame = self.overlay_origin;
        debug!(strip = %self.target_name, "grab committed");
    }

    /// Roll every participant and bystander back to its exact
    /// snapshot. Restoring directly can collide with strips still
    /// mid-restore, so everything is first staged past the timeline
    /// end, then placed. Safe to invoke on a session that never moved
    /// anything.
    pub fn cancel(&mut self, timeline: &mut Timeline) {
        let all: Vec<&StripSnapshot> = self
            .grabbed
            .iter()
            .chain(self.children.iter().map(|c| &c.snap))
            .chain(self.bystanders.iter())
            .collect();

        // The staging area must clear both the live layout and every
        // snapshot position.
        let (mut start, mut end, _) = timeline_extent(&timeline.strips);
        for snap in &all {
            start = start.min(snap.frame_final_start);
            end = end.max(snap.frame_final_end);
        }
        let stage = (end - start).max(1) + 1;

        for snap in &all {
            if let Some(strip) = timeline.get_mut(&snap.name) {
                strip.frame_start = snap.frame_start + stage;
                strip.frame_final_start = snap.frame_final_start + stage;
                strip.frame_final_end = snap.frame_final_end + stage;
                strip.channel = snap.channel;
            }
        }
        for snap in &all {
            if let Some(strip) = timeline.get_mut(&snap.name) {
                snap.restore(strip);
            }
        }

        timeline.cursor = self.cursor_origin;
        timeline.overlay_frame = self.overlay_origin;
        debug!(strip = %self.target_name, "grab cancelled");
    }
}

/// Resize one strip's edges from its snapshot by the given deltas
/// (None leaves an edge alone), clamping to a one-frame minimum body
/// and, for sound strips, to the bounds of the underlying source
/// media.
fn resize_from(
    strip: &mut Strip,
    snap: &StripSnapshot,
    left_dx: Option<Frame>,
    right_dx: Option<Frame>,
) {
    let mut ffs = snap.frame_final_start;
    let mut ffe = snap.frame_final_end;
    if let Some(dx) = left_dx {
        ffs = (snap.frame_final_start + dx).min(ffe - 1);
        if let StripKind::Sound { .. } = strip.kind {
            ffs = ffs.max(snap.frame_start);
        }
    }
    if let Some(dx) = right_dx {
        ffe = (snap.frame_final_end + dx).max(ffs + 1);
        if let StripKind::Sound { media_duration, .. } = strip.kind {
            ffe = ffe.min(snap.frame_start + media_duration);
        }
    }
    strip.frame_start = snap.frame_start;
    strip.frame_final_start = ffs;
    strip.frame_final_end = ffe;
    strip.channel = snap.channel;
}
