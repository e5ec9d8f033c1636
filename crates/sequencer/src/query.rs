use crate::{Channel, Frame, Strip};

/// Direction of a neighbor search relative to a pivot strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Adjacency semantics for `closest_in_direction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjacencyMode {
    /// Any strip in the direction, nearest by frame distance.
    Any,
    /// Only strips overlapping the pivot's frame range; ties broken by
    /// channel distance instead of frame distance.
    Overlap,
    /// Only strips on the pivot's channel.
    Channel,
    /// Ordered purely by start frame against the pivot's start.
    Simple,
    /// Any strip in the direction that does not overlap the pivot.
    NoOverlap,
}

/// True if any non-omitted, non-effect strip occupies part of the
/// half-open `[left, right)` interval within the channel band
/// `[bottom, top]`. `top == -1` means any channel at or above `bottom`.
///
/// O(n) and read-only; engines call this before every channel
/// reassignment.
pub fn area_filled(
    strips: &[Strip],
    left: Frame,
    right: Frame,
    bottom: Channel,
    top: Channel,
    omit: Option<&str>,
) -> bool {
    strips
        .iter()
        .any(|s| strip_in_area(s, left, right, bottom, top, omit))
}

/// Same test as `area_filled`, returning the matches.
pub fn matches_in_area<'a>(
    strips: &'a [Strip],
    left: Frame,
    right: Frame,
    bottom: Channel,
    top: Channel,
    omit: Option<&str>,
) -> Vec<&'a Strip> {
    strips
        .iter()
        .filter(|s| strip_in_area(s, left, right, bottom, top, omit))
        .collect()
}

fn strip_in_area(
    s: &Strip,
    left: Frame,
    right: Frame,
    bottom: Channel,
    top: Channel,
    omit: Option<&str>,
) -> bool {
    if s.is_effect() {
        return false;
    }
    if omit.is_some_and(|name| name == s.name) {
        return false;
    }
    if s.channel < bottom || (top != -1 && s.channel > top) {
        return false;
    }
    s.range_overlaps(left, right)
}

/// Probe channels upward from `from` until `[left, right)` is free.
/// Channel space is unbounded upward, so this always terminates.
pub fn first_free_channel(
    strips: &[Strip],
    left: Frame,
    right: Frame,
    from: Channel,
    omit: Option<&str>,
) -> Channel {
    let mut channel = from.max(1);
    while area_filled(strips, left, right, channel, channel, omit) {
        channel += 1;
    }
    channel
}

/// Nearest strip before or after `pivot` under the requested adjacency
/// semantics. Sound and effect strips are excluded unless requested.
pub fn closest_in_direction<'a>(
    strips: &'a [Strip],
    pivot: &Strip,
    direction: Direction,
    mode: AdjacencyMode,
    include_sound: bool,
    include_effects: bool,
) -> Option<&'a Strip> {
    let mut best: Option<(&Strip, Frame, Channel)> = None;
    for s in strips {
        if s.name == pivot.name {
            continue;
        }
        if s.is_sound() && !include_sound {
            continue;
        }
        if s.is_effect() && !include_effects {
            continue;
        }
        let overlapping = s.range_overlaps(pivot.frame_final_start, pivot.frame_final_end);
        match mode {
            AdjacencyMode::Overlap if !overlapping => continue,
            AdjacencyMode::NoOverlap if overlapping => continue,
            AdjacencyMode::Channel if s.channel != pivot.channel => continue,
            _ => {}
        }
        let frame_distance = match (direction, mode) {
            (Direction::Previous, AdjacencyMode::Simple) => {
                pivot.frame_final_start - s.frame_final_start
            }
            (Direction::Next, AdjacencyMode::Simple) => {
                s.frame_final_start - pivot.frame_final_start
            }
            (Direction::Previous, AdjacencyMode::Overlap) => {
                pivot.frame_final_start - s.frame_final_start
            }
            (Direction::Next, AdjacencyMode::Overlap) => {
                s.frame_final_start - pivot.frame_final_start
            }
            (Direction::Previous, _) => pivot.frame_final_start - s.frame_final_end,
            (Direction::Next, _) => s.frame_final_start - pivot.frame_final_end,
        };
        if frame_distance < 0 {
            continue;
        }
        let channel_distance = (s.channel - pivot.channel).abs();
        let better = match best {
            None => true,
            Some((_, best_frame, best_channel)) => {
                if frame_distance != best_frame {
                    frame_distance < best_frame
                } else if mode == AdjacencyMode::Overlap {
                    channel_distance < best_channel
                } else {
                    false
                }
            }
        };
        if better {
            best = Some((s, frame_distance, channel_distance));
        }
    }
    best.map(|(s, _, _)| s)
}

/// Min start, max end, max channel over all strips, each defaulting to
/// 1 on empty input.
pub fn timeline_extent(strips: &[Strip]) -> (Frame, Frame, Channel) {
    if strips.is_empty() {
        return (1, 1, 1);
    }
    let mut start = Frame::MAX;
    let mut end = Frame::MIN;
    let mut height = 1;
    for s in strips {
        start = start.min(s.frame_final_start);
        end = end.max(s.frame_final_end);
        height = height.max(s.channel);
    }
    (start, end, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Strip, StripKind};

    fn strip(name: &str, start: Frame, end: Frame, channel: Channel) -> Strip {
        Strip::new(name, StripKind::Meta, start, end, channel)
    }

    fn sound(name: &str, start: Frame, end: Frame, channel: Channel) -> Strip {
        Strip::new(
            name,
            StripKind::Sound {
                path: "a.wav".into(),
                media_duration: end - start,
            },
            start,
            end,
            channel,
        )
    }

    #[test]
    fn area_filled_respects_band_and_omit() {
        let strips = vec![strip("a", 0, 100, 1), strip("b", 50, 150, 3)];
        assert!(area_filled(&strips, 40, 60, 1, 1, None));
        assert!(!area_filled(&strips, 40, 60, 2, 2, None));
        assert!(area_filled(&strips, 40, 60, 2, -1, None));
        assert!(!area_filled(&strips, 40, 60, 1, 1, Some("a")));
        // Half-open: a strip ending at 100 does not fill [100, 120).
        assert!(!area_filled(&strips, 100, 120, 1, 1, None));

        let matches = matches_in_area(&strips, 40, 60, 1, -1, None);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn free_channel_probes_upward() {
        let strips = vec![strip("a", 0, 100, 1), strip("b", 0, 100, 2)];
        assert_eq!(first_free_channel(&strips, 50, 60, 1, None), 3);
        assert_eq!(first_free_channel(&strips, 200, 260, 1, None), 1);
        // Channel floor is 1.
        assert_eq!(first_free_channel(&strips, 200, 260, -5, None), 1);
    }

    #[test]
    fn closest_next_prefers_smallest_gap() {
        let strips = vec![
            strip("a", 0, 100, 1),
            strip("near", 110, 150, 2),
            strip("far", 200, 250, 1),
        ];
        let pivot = strips[0].clone();
        let found = closest_in_direction(
            &strips,
            &pivot,
            Direction::Next,
            AdjacencyMode::Any,
            false,
            false,
        )
        .unwrap();
        assert_eq!(found.name, "near");
    }

    #[test]
    fn channel_mode_restricts_lane() {
        let strips = vec![
            strip("a", 0, 100, 1),
            strip("near", 110, 150, 2),
            strip("far", 200, 250, 1),
        ];
        let pivot = strips[0].clone();
        let found = closest_in_direction(
            &strips,
            &pivot,
            Direction::Next,
            AdjacencyMode::Channel,
            false,
            false,
        )
        .unwrap();
        assert_eq!(found.name, "far");
    }

    #[test]
    fn overlap_mode_ties_break_by_channel() {
        let strips = vec![
            strip("a", 0, 100, 3),
            strip("low", 0, 100, 1),
            strip("close", 0, 100, 4),
        ];
        let pivot = strips[0].clone();
        let found = closest_in_direction(
            &strips,
            &pivot,
            Direction::Next,
            AdjacencyMode::Overlap,
            false,
            false,
        )
        .unwrap();
        assert_eq!(found.name, "close");
    }

    #[test]
    fn sound_excluded_unless_requested() {
        let strips = vec![strip("a", 0, 100, 1), sound("s", 110, 150, 1)];
        let pivot = strips[0].clone();
        assert!(closest_in_direction(
            &strips,
            &pivot,
            Direction::Next,
            AdjacencyMode::Any,
            false,
            false
        )
        .is_none());
        assert!(closest_in_direction(
            &strips,
            &pivot,
            Direction::Next,
            AdjacencyMode::Any,
            true,
            false
        )
        .is_some());
    }

    #[test]
    fn extent_defaults_on_empty() {
        assert_eq!(timeline_extent(&[]), (1, 1, 1));
        let strips = vec![strip("a", -20, 100, 2), strip("b", 50, 400, 5)];
        assert_eq!(timeline_extent(&strips), (-20, 400, 5));
    }
}
