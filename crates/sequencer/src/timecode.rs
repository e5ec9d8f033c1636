/// Timecode display for cursor readouts and drag overlays.
use crate::{Fps, Frame};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the last timecode component shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubSecondMode {
    /// Frames within the second (`FF`).
    #[default]
    Frames,
    /// Centiseconds within the second.
    Centiseconds,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timecode {
    pub negative: bool,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub frames: i64,
}

impl Timecode {
    pub fn from_frame(frame: Frame, fps: Fps) -> Self {
        let negative = frame < 0;
        let frame = frame.abs();
        let per_second = fps.rounded();
        let total_seconds = frame / per_second;
        Self {
            negative,
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
            frames: frame % per_second,
        }
    }

    pub fn to_frame(&self, fps: Fps) -> Frame {
        let per_second = fps.rounded();
        let total =
            (self.hours * 3600 + self.minutes * 60 + self.seconds) * per_second + self.frames;
        if self.negative {
            -total
        } else {
            total
        }
    }

    /// Parse `H:MM:SS:FF`-style text, tolerating a leading `-` and
    /// fewer than four components (missing leading components are
    /// zero).
    pub fn parse(s: &str, fps: Fps) -> Result<Self, String> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let parts: Vec<&str> = body.split(':').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err("expected H:MM:SS:FF".to_string());
        }
        let mut values = [0i64; 4];
        let offset = 4 - parts.len();
        for (i, part) in parts.iter().enumerate() {
            values[offset + i] = part
                .parse::<i64>()
                .map_err(|_| format!("invalid component: {part}"))?;
        }
        let [hours, minutes, seconds, frames] = values;
        if minutes >= 60 || seconds >= 60 {
            return Err("minutes and seconds must be < 60".to_string());
        }
        if frames >= fps.rounded() {
            return Err(format!("frames must be < {}", fps.rounded()));
        }
        Ok(Self {
            negative,
            hours,
            minutes,
            seconds,
            frames,
        })
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-")?;
        }
        write!(
            f,
            "{}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

/// Format a signed frame count as display timecode.
///
/// `levels` counts components from the right: 1 shows only the last
/// component, 4 forces `H:MM:SS:FF`. 0 auto-crops leading zero
/// components (never below seconds plus the sub-second component).
pub fn timecode(frame: Frame, fps: Fps, levels: u8, subsecond: SubSecondMode) -> String {
    let tc = Timecode::from_frame(frame, fps);
    let last = match subsecond {
        SubSecondMode::Frames => tc.frames,
        SubSecondMode::Centiseconds => tc.frames * 100 / fps.rounded(),
    };
    let components = [tc.hours, tc.minutes, tc.seconds, last];

    let shown = if levels == 0 {
        if tc.hours != 0 {
            4
        } else if tc.minutes != 0 {
            3
        } else {
            2
        }
    } else {
        levels.min(4) as usize
    };

    let mut out = String::new();
    if tc.negative {
        out.push('-');
    }
    for (i, value) in components[4 - shown..].iter().enumerate() {
        if i == 0 {
            out.push_str(&value.to_string());
        } else {
            out.push_str(&format!(":{value:02}"));
        }
    }
    out
}
