/// Command dispatch surface: every engine operation invoked with
/// explicit parameters, returning a status plus user-facing warnings.
/// Precondition misses cancel without mutating; genuine contract
/// violations (an unknown strip named explicitly) surface as errors.
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    add_children, clear_children, clear_parent, crossfade, delete_selected, insert, is_descendant,
    ripple, ripple_trim, set_fade, slide_trim, split, trim, uncut, CrossfadeOutcome, CurveBank,
    FadeDirection, Frame, Marker, Prefs, SequencerError, Side, SplitMode, Timeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    Completed,
    Cancelled,
}

/// Result of one user action. `action` labels the host's undo
/// boundary; warnings are informational and never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpReport {
    pub status: OpStatus,
    pub warnings: Vec<String>,
    pub action: String,
}

impl OpReport {
    pub fn completed(action: &str) -> Self {
        Self {
            status: OpStatus::Completed,
            warnings: Vec::new(),
            action: action.to_string(),
        }
    }

    pub fn cancelled(action: &str) -> Self {
        Self {
            status: OpStatus::Cancelled,
            warnings: Vec::new(),
            action: action.to_string(),
        }
    }

    pub fn warn(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditCommand {
    Ripple {
        pivot: Frame,
        offset: Frame,
    },
    Split {
        frame: Frame,
        #[serde(default)]
        mode: SplitMode,
        #[serde(default)]
        side: Side,
    },
    Insert {
        frame: Frame,
        gap: Frame,
    },
    Trim {
        frame: Frame,
        side: Side,
    },
    SlideTrim {
        frame: Frame,
        side: Side,
    },
    RippleTrim {
        frame: Frame,
        side: Side,
    },
    Uncut {
        strip: String,
        #[serde(default)]
        side: Side,
    },
    Delete {
        #[serde(default)]
        ripple: bool,
    },
    /// Set (or with length 0, clear) fades on every selected strip.
    /// No direction means both.
    Fade {
        length: Frame,
        #[serde(default)]
        direction: Option<FadeDirection>,
    },
    Crossfade {
        /// Source strip; defaults to the first selected strip.
        #[serde(default)]
        strip: Option<String>,
        /// Target overlap; defaults to the configured fade length.
        #[serde(default)]
        length: Option<Frame>,
        #[serde(default)]
        smart: bool,
    },
    SetParent {
        parent: String,
        children: Vec<String>,
    },
    ClearParent {
        children: Vec<String>,
    },
    ClearChildren {
        parent: String,
    },
    AddMarker {
        frame: Frame,
        label: String,
    },
    RemoveMarker {
        label: String,
    },
    SetInPoint {
        frame: Frame,
    },
    SetOutPoint {
        frame: Frame,
    },
    ClearInOut,
    Rename {
        from: String,
        to: String,
    },
}

/// Apply one command as a single user action.
pub fn apply_command(
    timeline: &mut Timeline,
    curves: &mut CurveBank,
    prefs: &Prefs,
    command: EditCommand,
) -> Result<OpReport, SequencerError> {
    debug!(?command, "apply command");
    match command {
        EditCommand::Ripple { pivot, offset } => {
            ripple(timeline, pivot, offset, prefs);
            Ok(OpReport::completed("Ripple"))
        }
        EditCommand::Split { frame, mode, side } => {
            let pairs = split(timeline, frame, mode, side, prefs);
            if pairs.is_empty() {
                Ok(OpReport::cancelled("Split"))
            } else {
                Ok(OpReport::completed("Split"))
            }
        }
        EditCommand::Insert { frame, gap } => {
            insert(timeline, frame, gap, prefs);
            Ok(OpReport::completed("Insert"))
        }
        EditCommand::Trim { frame, side } => {
            let touched = trim(timeline, frame, side, prefs)?;
            if touched.is_empty() {
                Ok(OpReport::cancelled("Trim"))
            } else {
                Ok(OpReport::completed("Trim"))
            }
        }
        EditCommand::SlideTrim { frame, side } => {
            let touched = slide_trim(timeline, frame, side, prefs)?;
            if touched.is_empty() {
                Ok(OpReport::cancelled("Slide Trim"))
            } else {
                Ok(OpReport::completed("Slide Trim"))
            }
        }
        EditCommand::RippleTrim { frame, side } => {
            let touched = ripple_trim(timeline, frame, side, prefs)?;
            if touched.is_empty() {
                Ok(OpReport::cancelled("Ripple Trim"))
            } else {
                Ok(OpReport::completed("Ripple Trim"))
            }
        }
        EditCommand::Uncut { strip, side } => {
            let absorbed = uncut(timeline, &strip, side)?;
            if absorbed.is_empty() {
                let warning = match side {
                    Side::Left => "No Previous Strip Found",
                    _ => "No Next Strip Found",
                };
                Ok(OpReport::cancelled("Uncut").warn(warning))
            } else {
                for name in &absorbed {
                    curves.remove_strip(name);
                }
                Ok(OpReport::completed("Uncut"))
            }
        }
        EditCommand::Delete { ripple } => {
            let deleted = delete_selected(timeline, curves, ripple, prefs);
            if deleted.is_empty() {
                Ok(OpReport::cancelled("Delete"))
            } else {
                Ok(OpReport::completed("Delete"))
            }
        }
        EditCommand::Fade { length, direction } => {
            let targets: Vec<String> = timeline
                .strips
                .iter()
                .filter(|s| s.any_select() && !s.lock && !s.is_effect())
                .map(|s| s.name.clone())
                .collect();
            if targets.is_empty() {
                return Ok(OpReport::cancelled("Fade"));
            }
            for name in targets {
                let Some(strip) = timeline.get(&name).cloned() else {
                    continue;
                };
                match direction {
                    Some(d) => set_fade(curves, &strip, d, length),
                    None => {
                        set_fade(curves, &strip, FadeDirection::In, length);
                        set_fade(curves, &strip, FadeDirection::Out, length);
                    }
                }
            }
            Ok(OpReport::completed("Fade"))
        }
        EditCommand::Crossfade {
            strip,
            length,
            smart,
        } => {
            let first = match strip {
                Some(name) => name,
                None => {
                    let Some(s) = timeline
                        .strips
                        .iter()
                        .find(|s| s.any_select() && !s.is_effect())
                    else {
                        return Ok(OpReport::cancelled("Crossfade"));
                    };
                    s.name.clone()
                }
            };
            let length = length.unwrap_or(prefs.default_fade_length);
            match crossfade(timeline, &first, length, smart)? {
                CrossfadeOutcome::Created(_) => Ok(OpReport::completed("Crossfade")),
                CrossfadeOutcome::NoSecondStrip => {
                    Ok(OpReport::cancelled("Crossfade").warn("No Second Strip Found"))
                }
                CrossfadeOutcome::NoOverlap => Ok(OpReport::cancelled("Crossfade")
                    .warn("Strips do not overlap; use a smart crossfade")),
            }
        }
        EditCommand::SetParent { parent, children } => {
            if !timeline.contains(&parent) {
                return Err(SequencerError::StripNotFound(parent));
            }
            let mut report = OpReport::completed("Set Parent");
            let mut accepted = Vec::new();
            for child in children {
                if !timeline.contains(&child) {
                    report = report.warn(format!("No strip named '{child}'"));
                    continue;
                }
                if child == parent || is_descendant(&timeline.strips, &child, &parent) {
                    report = report.warn(format!("'{child}' cannot parent its own ancestor"));
                    continue;
                }
                accepted.push(child);
            }
            if accepted.is_empty() {
                report.status = OpStatus::Cancelled;
            } else {
                add_children(&mut timeline.strips, &parent, &accepted);
            }
            Ok(report)
        }
        EditCommand::ClearParent { children } => {
            for child in &children {
                clear_parent(&mut timeline.strips, child);
            }
            Ok(OpReport::completed("Clear Parent"))
        }
        EditCommand::ClearChildren { parent } => {
            clear_children(&mut timeline.strips, &parent);
            Ok(OpReport::completed("Clear Children"))
        }
        EditCommand::AddMarker { frame, label } => {
            timeline.markers.add_marker(Marker::new(frame, label));
            Ok(OpReport::completed("Add Marker"))
        }
        EditCommand::RemoveMarker { label } => {
            if timeline.markers.remove_labeled(&label).is_none() {
                Ok(OpReport::cancelled("Remove Marker")
                    .warn(format!("No marker labeled '{label}'")))
            } else {
                Ok(OpReport::completed("Remove Marker"))
            }
        }
        EditCommand::SetInPoint { frame } => {
            timeline.markers.set_in_point(frame);
            Ok(OpReport::completed("Set In Point"))
        }
        EditCommand::SetOutPoint { frame } => {
            timeline.markers.set_out_point(frame);
            Ok(OpReport::completed("Set Out Point"))
        }
        EditCommand::ClearInOut => {
            timeline.markers.clear_in_out();
            Ok(OpReport::completed("Clear In/Out"))
        }
        EditCommand::Rename { from, to } => {
            timeline.rename(&from, &to)?;
            curves.rename_strip(&from, &to);
            Ok(OpReport::completed("Rename"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CurveProp, Fps, Strip, StripKind};

    fn movie(name: &str, start: Frame, end: Frame, select: bool) -> Strip {
        let mut s = Strip::new(
            name,
            StripKind::Movie {
                path: "clips/a.mp4".into(),
                media_duration: 1000,
            },
            start,
            end,
            1,
        );
        s.select = select;
        s
    }

    fn setup(strips: Vec<Strip>) -> (Timeline, CurveBank, Prefs) {
        let mut tl = Timeline::new(Fps::default());
        for s in strips {
            tl.add(s);
        }
        (tl, CurveBank::new(), Prefs::default())
    }

    #[test]
    fn empty_selection_cancels_without_mutation() {
        let (mut tl, mut curves, prefs) = setup(vec![movie("a", 0, 100, false)]);
        let before = tl.strips.clone();
        let report =
            apply_command(&mut tl, &mut curves, &prefs, EditCommand::Delete { ripple: true })
                .unwrap();
        assert_eq!(report.status, OpStatus::Cancelled);
        assert_eq!(tl.strips, before);
    }

    #[test]
    fn split_reports_completion() {
        let (mut tl, mut curves, prefs) = setup(vec![movie("a", 0, 100, true)]);
        let report = apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::Split {
                frame: 50,
                mode: SplitMode::Soft,
                side: Side::Both,
            },
        )
        .unwrap();
        assert_eq!(report.status, OpStatus::Completed);
        assert_eq!(tl.strips.len(), 2);
    }

    #[test]
    fn crossfade_without_neighbor_warns() {
        let (mut tl, mut curves, prefs) = setup(vec![movie("a", 0, 100, true)]);
        let report = apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::Crossfade {
                strip: None,
                length: None,
                smart: true,
            },
        )
        .unwrap();
        assert_eq!(report.status, OpStatus::Cancelled);
        assert_eq!(report.warnings, vec!["No Second Strip Found".to_string()]);
    }

    #[test]
    fn fade_applies_to_every_selected_strip() {
        let (mut tl, mut curves, prefs) =
            setup(vec![movie("a", 0, 100, true), movie("b", 200, 300, true)]);
        let report = apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::Fade {
                length: 10,
                direction: None,
            },
        )
        .unwrap();
        assert_eq!(report.status, OpStatus::Completed);
        assert!(curves.get("a", CurveProp::Opacity).is_some());
        assert!(curves.get("b", CurveProp::Opacity).is_some());
    }

    #[test]
    fn set_parent_refuses_cycles_and_unknowns() {
        let (mut tl, mut curves, prefs) =
            setup(vec![movie("p", 0, 100, false), movie("c", 0, 100, false)]);
        apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::SetParent {
                parent: "p".into(),
                children: vec!["c".into()],
            },
        )
        .unwrap();
        assert_eq!(tl.get("c").unwrap().parent.as_deref(), Some("p"));

        // Parenting p under its own descendant must be refused.
        let report = apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::SetParent {
                parent: "c".into(),
                children: vec!["p".into(), "ghost".into()],
            },
        )
        .unwrap();
        assert_eq!(report.status, OpStatus::Cancelled);
        assert_eq!(report.warnings.len(), 2);
        assert!(tl.get("p").unwrap().parent.is_none());
    }

    #[test]
    fn unknown_strip_in_explicit_command_errors() {
        let (mut tl, mut curves, prefs) = setup(vec![movie("a", 0, 100, true)]);
        let err = apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::Uncut {
                strip: "ghost".into(),
                side: Side::Right,
            },
        );
        assert!(err.is_err());
    }

    #[test]
    fn rename_keeps_curves_attached() {
        let (mut tl, mut curves, prefs) = setup(vec![movie("a", 0, 100, true)]);
        apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::Fade {
                length: 10,
                direction: Some(FadeDirection::In),
            },
        )
        .unwrap();
        apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::Rename {
                from: "a".into(),
                to: "intro".into(),
            },
        )
        .unwrap();
        assert!(curves.get("a", CurveProp::Opacity).is_none());
        assert!(curves.get("intro", CurveProp::Opacity).is_some());
    }

    #[test]
    fn marker_commands_round_trip() {
        let (mut tl, mut curves, prefs) = setup(vec![]);
        apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::AddMarker {
                frame: 50,
                label: "scene".into(),
            },
        )
        .unwrap();
        apply_command(&mut tl, &mut curves, &prefs, EditCommand::SetInPoint { frame: 10 })
            .unwrap();
        apply_command(&mut tl, &mut curves, &prefs, EditCommand::SetOutPoint { frame: 90 })
            .unwrap();
        assert_eq!(tl.markers.get_in_out_range(), Some((10, 90)));

        let report = apply_command(
            &mut tl,
            &mut curves,
            &prefs,
            EditCommand::RemoveMarker {
                label: "nope".into(),
            },
        )
        .unwrap();
        assert_eq!(report.status, OpStatus::Cancelled);
    }

    #[test]
    fn commands_serialize_with_a_tag() {
        let cmd = EditCommand::RippleTrim {
            frame: 80,
            side: Side::Right,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"ripple_trim\""));
        let back: EditCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
