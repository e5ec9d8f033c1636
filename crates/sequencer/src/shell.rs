/// Interaction shell: modal-operator contracts between a host front
/// end and the engines. The shell translates raw input events into
/// engine calls and draws transient overlays; it holds no timeline
/// state of its own beyond the live grab session.
use crate::{
    timecode, CurveBank, Frame, GrabInput, GrabSession, GrabTarget, Prefs, SequencerError,
    SubSecondMode, Timeline,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    PointerMove { x: f64, y: f64 },

    /// Primary release confirms; secondary press cancels.
    Button { primary: bool },

    Key(Key),

    /// Timer tick, used to re-apply continuous effects independent of
    /// pointer motion.
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ToggleRipple,
    ToggleRipplePop,
    Confirm,
    Cancel,
}

/// What a modal operator tells the host after each event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalStatus {
    Running,
    Finished,
    Cancelled,
}

pub type Color = [f32; 4];

/// Fire-and-forget overlay drawing; the engine never reads back.
pub trait OverlaySurface {
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Color);
    fn rect(&mut self, origin: (f32, f32), size: (f32, f32), color: Color);
    fn tri(&mut self, a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Color);
    fn text(&mut self, at: (f32, f32), label: &str, color: Color);
}

/// Pixel-to-timeline mapping for the active view.
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    pub frames_per_pixel: f64,
    pub channel_height: f64,

    /// Frame shown at x = 0.
    pub origin_frame: Frame,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            frames_per_pixel: 1.0,
            channel_height: 20.0,
            origin_frame: 0,
        }
    }
}

impl ViewTransform {
    pub fn frame_to_x(&self, frame: Frame) -> f32 {
        ((frame - self.origin_frame) as f64 / self.frames_per_pixel.max(f64::EPSILON)) as f32
    }

    pub fn channel_to_y(&self, channel: i64) -> f32 {
        (channel as f64 * self.channel_height) as f32
    }
}

const EDGE_LABEL_COLOR: Color = [1.0, 1.0, 1.0, 0.9];
const EDGE_LINE_COLOR: Color = [0.9, 0.6, 0.1, 0.8];

/// Modal operator for interactive grabs. The host forwards one event
/// at a time; the operator maps pointer deltas to frame/channel
/// offsets and drives the grab session until confirm or cancel.
pub struct GrabOperator {
    session: GrabSession,
    view: ViewTransform,
    anchor: (f64, f64),
    input: GrabInput,
}

impl GrabOperator {
    pub fn begin(
        timeline: &Timeline,
        curves: &CurveBank,
        view: ViewTransform,
        pointer: (f64, f64),
    ) -> Result<Self, SequencerError> {
        Ok(Self {
            session: GrabSession::begin(timeline, curves)?,
            view,
            anchor: pointer,
            input: GrabInput::default(),
        })
    }

    pub fn session(&self) -> &GrabSession {
        &self.session
    }

    pub fn handle_event(
        &mut self,
        timeline: &mut Timeline,
        curves: &mut CurveBank,
        prefs: &Prefs,
        event: Event,
    ) -> ModalStatus {
        match event {
            Event::PointerMove { x, y } => {
                self.input.dx =
                    ((x - self.anchor.0) * self.view.frames_per_pixel).round() as Frame;
                // Screen y grows downward; channels grow upward.
                self.input.dy = -(((y - self.anchor.1)
                    / self.view.channel_height.max(f64::EPSILON))
                .round() as i64);
                self.session.tick(timeline, self.input, prefs);
                ModalStatus::Running
            }
            Event::Key(Key::ToggleRipple) => {
                self.input.ripple = !self.input.ripple;
                self.session.tick(timeline, self.input, prefs);
                ModalStatus::Running
            }
            Event::Key(Key::ToggleRipplePop) => {
                self.input.ripple_pop = !self.input.ripple_pop;
                self.session.tick(timeline, self.input, prefs);
                ModalStatus::Running
            }
            Event::Tick => {
                self.session.tick(timeline, self.input, prefs);
                ModalStatus::Running
            }
            Event::Button { primary: true } | Event::Key(Key::Confirm) => {
                self.session.commit(timeline, curves, prefs);
                ModalStatus::Finished
            }
            Event::Button { primary: false } | Event::Key(Key::Cancel) => {
                self.session.cancel(timeline);
                ModalStatus::Cancelled
            }
        }
    }

    /// Transient feedback: a marker line and timecode label at every
    /// dragged edge.
    pub fn draw(&self, timeline: &Timeline, surface: &mut dyn OverlaySurface) {
        for snap in self.session.grabbed() {
            let Some(live) = timeline.get(&snap.name) else {
                continue;
            };
            let mut edges: Vec<Frame> = Vec::new();
            if snap.select_left_handle {
                edges.push(live.frame_final_start);
            }
            if snap.select_right_handle {
                edges.push(live.frame_final_end);
            }
            if edges.is_empty() && snap.select {
                edges.push(live.frame_final_start);
            }
            for frame in edges {
                let x = self.view.frame_to_x(frame);
                let top = self.view.channel_to_y(live.channel);
                let bottom = self.view.channel_to_y(live.channel + 1);
                surface.line((x, top), (x, bottom), EDGE_LINE_COLOR);
                surface.text(
                    (x, top),
                    &timecode(frame, timeline.fps, 0, SubSecondMode::Frames),
                    EDGE_LABEL_COLOR,
                );
            }
        }
        if let (GrabTarget::Body, name) = self.session.target() {
            if let Some(live) = timeline.get(name) {
                let x = self.view.frame_to_x(live.frame_final_start);
                let y = self.view.channel_to_y(live.channel);
                surface.rect(
                    (x, y),
                    (
                        self.view.frame_to_x(live.frame_final_end) - x,
                        self.view.channel_height as f32,
                    ),
                    [0.9, 0.6, 0.1, 0.25],
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fps, Strip, StripKind};

    fn timeline_with_selected(name: &str) -> Timeline {
        let mut tl = Timeline::new(Fps::default());
        let mut s = Strip::new(
            name,
            StripKind::Movie {
                path: "clips/a.mp4".into(),
                media_duration: 1000,
            },
            0,
            100,
            1,
        );
        s.select = true;
        tl.add(s);
        tl
    }

    #[derive(Default)]
    struct RecordingSurface {
        lines: usize,
        texts: Vec<String>,
    }

    impl OverlaySurface for RecordingSurface {
        fn line(&mut self, _: (f32, f32), _: (f32, f32), _: Color) {
            self.lines += 1;
        }
        fn rect(&mut self, _: (f32, f32), _: (f32, f32), _: Color) {}
        fn tri(&mut self, _: (f32, f32), _: (f32, f32), _: (f32, f32), _: Color) {}
        fn text(&mut self, _: (f32, f32), label: &str, _: Color) {
            self.texts.push(label.to_string());
        }
    }

    #[test]
    fn pointer_motion_maps_to_frames_and_channels() {
        let mut tl = timeline_with_selected("a");
        let mut curves = CurveBank::new();
        let view = ViewTransform {
            frames_per_pixel: 2.0,
            channel_height: 10.0,
            origin_frame: 0,
        };
        let mut op = GrabOperator::begin(&tl, &curves, view, (100.0, 100.0)).unwrap();

        let status = op.handle_event(
            &mut tl,
            &mut curves,
            &Prefs::default(),
            Event::PointerMove { x: 125.0, y: 80.0 },
        );
        assert_eq!(status, ModalStatus::Running);
        let a = tl.get("a").unwrap();
        // 25 px * 2 frames/px; 20 px up = 2 channels up.
        assert_eq!(a.frame_final_start, 50);
        assert_eq!(a.channel, 3);
    }

    #[test]
    fn confirm_finishes_and_cancel_rolls_back() {
        let mut tl = timeline_with_selected("a");
        let mut curves = CurveBank::new();
        let mut op =
            GrabOperator::begin(&tl, &curves, ViewTransform::default(), (0.0, 0.0)).unwrap();
        op.handle_event(
            &mut tl,
            &mut curves,
            &Prefs::default(),
            Event::PointerMove { x: 40.0, y: 0.0 },
        );
        let status = op.handle_event(
            &mut tl,
            &mut curves,
            &Prefs::default(),
            Event::Button { primary: true },
        );
        assert_eq!(status, ModalStatus::Finished);
        assert_eq!(tl.get("a").unwrap().frame_final_start, 40);

        let mut op =
            GrabOperator::begin(&tl, &curves, ViewTransform::default(), (0.0, 0.0)).unwrap();
        op.handle_event(
            &mut tl,
            &mut curves,
            &Prefs::default(),
            Event::PointerMove { x: 33.0, y: 0.0 },
        );
        let status = op.handle_event(
            &mut tl,
            &mut curves,
            &Prefs::default(),
            Event::Key(Key::Cancel),
        );
        assert_eq!(status, ModalStatus::Cancelled);
        assert_eq!(tl.get("a").unwrap().frame_final_start, 40);
    }

    #[test]
    fn ripple_toggles_mid_drag() {
        let mut tl = timeline_with_selected("a");
        let mut curves = CurveBank::new();
        let mut op =
            GrabOperator::begin(&tl, &curves, ViewTransform::default(), (0.0, 0.0)).unwrap();
        op.handle_event(
            &mut tl,
            &mut curves,
            &Prefs::default(),
            Event::Key(Key::ToggleRipple),
        );
        assert!(op.session().input().ripple);
        op.handle_event(
            &mut tl,
            &mut curves,
            &Prefs::default(),
            Event::Key(Key::ToggleRipple),
        );
        assert!(!op.session().input().ripple);
    }

    #[test]
    fn draw_labels_dragged_edges() {
        let mut tl = timeline_with_selected("a");
        tl.get_mut("a").unwrap().select = false;
        tl.get_mut("a").unwrap().select_right_handle = true;
        let curves = CurveBank::new();
        let op = GrabOperator::begin(&tl, &curves, ViewTransform::default(), (0.0, 0.0)).unwrap();

        let mut surface = RecordingSurface::default();
        op.draw(&tl, &mut surface);
        assert_eq!(surface.lines, 1);
        // 100 frames at 30 fps.
        assert_eq!(surface.texts, vec!["3:10".to_string()]);
    }
}
