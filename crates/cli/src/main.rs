use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sequencer::{
    apply_command, expand_selection_to_children, timecode, CurveBank, EditCommand, FadeDirection,
    Fps, Frame, OpStatus, Prefs, Side, SplitMode, Strip, StripKind, SubSecondMode, Timecode,
    Timeline,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "splicer-cli")]
#[command(about = "Splicer CLI - headless timeline editing operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project document
    New {
        /// Project file path
        #[arg(short, long)]
        project: PathBuf,

        /// Frame rate (e.g., 30, 25, 24)
        #[arg(long, default_value_t = 30)]
        fps: u32,
    },

    /// Add a strip to the timeline
    Add {
        #[arg(short, long)]
        project: PathBuf,

        /// Strip name; suffixed on collision
        name: String,

        /// Visible start frame
        start: Frame,

        /// Visible end frame (exclusive)
        end: Frame,

        #[arg(long, value_enum, default_value = "movie")]
        kind: KindArg,

        /// Source file path (movie, sound)
        #[arg(long)]
        path: Option<String>,

        /// Source directory (image)
        #[arg(long)]
        directory: Option<String>,

        /// Source filename (image)
        #[arg(long)]
        filename: Option<String>,

        /// Referenced scene (scene)
        #[arg(long)]
        scene: Option<String>,

        /// Source media length in frames (movie, sound); defaults to
        /// the visible length
        #[arg(long)]
        media_duration: Option<Frame>,

        #[arg(long, default_value_t = 1)]
        channel: i64,

        #[arg(long)]
        select: bool,
    },

    /// Change which strips (and handles) are selected
    Select {
        #[arg(short, long)]
        project: PathBuf,

        /// Strip names; body-selected unless a handle flag is given
        names: Vec<String>,

        /// Select the left handle instead of the body
        #[arg(long)]
        left: bool,

        /// Select the right handle instead of the body
        #[arg(long)]
        right: bool,

        /// Keep the existing selection
        #[arg(long)]
        add: bool,

        /// Expand the selection to all descendants
        #[arg(long)]
        children: bool,
    },

    /// Shift everything past a pivot by a signed offset
    Ripple {
        #[arg(short, long)]
        project: PathBuf,

        pivot: Frame,
        offset: Frame,
    },

    /// Split spanning strips at a frame
    Split {
        #[arg(short, long)]
        project: PathBuf,

        frame: Frame,

        /// Re-anchor the right halves at the cut
        #[arg(long)]
        hard: bool,

        /// Which halves keep the selection
        #[arg(long, value_enum, default_value = "both")]
        side: SideArg,
    },

    /// Split, then ripple a gap open after the cut
    Insert {
        #[arg(short, long)]
        project: PathBuf,

        frame: Frame,

        /// Gap length in frames
        gap: Frame,
    },

    /// Truncate spanning strips' edges to the cut frame
    Trim {
        #[arg(short, long)]
        project: PathBuf,

        frame: Frame,

        #[arg(value_enum)]
        side: SideArg,
    },

    /// Trim while preserving the content's source alignment
    SlideTrim {
        #[arg(short, long)]
        project: PathBuf,

        frame: Frame,

        #[arg(value_enum)]
        side: SideArg,
    },

    /// Trim, then ripple the gap closed
    RippleTrim {
        #[arg(short, long)]
        project: PathBuf,

        frame: Frame,

        #[arg(value_enum)]
        side: SideArg,
    },

    /// Merge a strip with its same-source adjacent neighbor
    Uncut {
        #[arg(short, long)]
        project: PathBuf,

        strip: String,

        #[arg(long, value_enum, default_value = "right")]
        side: SideArg,
    },

    /// Delete selected strips, optionally rippling the holes closed
    Delete {
        #[arg(short, long)]
        project: PathBuf,

        #[arg(long)]
        ripple: bool,
    },

    /// Set fades on selected strips (length 0 clears)
    Fade {
        #[arg(short, long)]
        project: PathBuf,

        length: Frame,

        /// Fade direction; both when omitted
        #[arg(long, value_enum)]
        direction: Option<FadeArg>,
    },

    /// Create a crossfade transition to the next strip
    Crossfade {
        #[arg(short, long)]
        project: PathBuf,

        /// Source strip; defaults to the first selected strip
        #[arg(long)]
        strip: Option<String>,

        /// Target overlap length; defaults to the configured fade
        /// length
        #[arg(long)]
        length: Option<Frame>,

        /// Adjust both strips' edges so the overlap matches the target
        #[arg(long)]
        smart: bool,
    },

    /// Parent strips to another strip, or clear links
    Parent {
        #[arg(short, long)]
        project: PathBuf,

        /// Parent strip name (omit with --clear)
        parent: Option<String>,

        children: Vec<String>,

        /// Clear the named children's parent links instead
        #[arg(long)]
        clear: bool,

        /// Clear all children of the parent instead
        #[arg(long)]
        clear_children: bool,
    },

    /// Manage timeline markers and the in/out range
    Marker {
        #[arg(short, long)]
        project: PathBuf,

        #[command(subcommand)]
        action: MarkerAction,
    },

    /// Rename a strip, keeping children and curves attached
    Rename {
        #[arg(short, long)]
        project: PathBuf,

        from: String,
        to: String,
    },

    /// Print the timeline
    Inspect {
        #[arg(short, long)]
        project: PathBuf,
    },

    /// Convert between frame counts and timecode text
    Timecode {
        /// A frame count to format, or H:MM:SS:FF text to parse
        value: String,

        #[arg(long, default_value_t = 30)]
        fps: u32,

        /// Force a component count (1-4); 0 auto-crops
        #[arg(long, default_value_t = 0)]
        levels: u8,

        /// Show centiseconds instead of frames
        #[arg(long)]
        centiseconds: bool,
    },
}

#[derive(Subcommand)]
enum MarkerAction {
    /// Add a marker
    Add { frame: Frame, label: String },

    /// Remove the first marker with a label
    Remove { label: String },

    /// Set the in point
    In { frame: Frame },

    /// Set the out point
    Out { frame: Frame },

    /// Clear the in/out range
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Movie,
    Sound,
    Image,
    Scene,
    Meta,
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Left,
    Right,
    Both,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
            SideArg::Both => Side::Both,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FadeArg {
    In,
    Out,
}

impl From<FadeArg> for FadeDirection {
    fn from(direction: FadeArg) -> Self {
        match direction {
            FadeArg::In => FadeDirection::In,
            FadeArg::Out => FadeDirection::Out,
        }
    }
}

/// The project document the CLI round-trips: the timeline plus its
/// fade curves and session preferences.
#[derive(Serialize, Deserialize)]
struct Project {
    timeline: Timeline,

    #[serde(default)]
    curves: CurveBank,

    #[serde(default)]
    prefs: Prefs,
}

impl Project {
    fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read project: {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse project: {}", path.display()))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)
            .with_context(|| format!("failed to write project: {}", path.display()))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::New { project, fps } => new_command(&project, fps),
        Commands::Add {
            project,
            name,
            start,
            end,
            kind,
            path,
            directory,
            filename,
            scene,
            media_duration,
            channel,
            select,
        } => add_command(
            &project,
            name,
            start,
            end,
            kind,
            path,
            directory,
            filename,
            scene,
            media_duration,
            channel,
            select,
        ),
        Commands::Select {
            project,
            names,
            left,
            right,
            add,
            children,
        } => select_command(&project, names, left, right, add, children),
        Commands::Ripple {
            project,
            pivot,
            offset,
        } => run_edit(&project, EditCommand::Ripple { pivot, offset }),
        Commands::Split {
            project,
            frame,
            hard,
            side,
        } => run_edit(
            &project,
            EditCommand::Split {
                frame,
                mode: if hard {
                    SplitMode::Hard
                } else {
                    SplitMode::Soft
                },
                side: side.into(),
            },
        ),
        Commands::Insert { project, frame, gap } => {
            run_edit(&project, EditCommand::Insert { frame, gap })
        }
        Commands::Trim {
            project,
            frame,
            side,
        } => run_edit(
            &project,
            EditCommand::Trim {
                frame,
                side: side.into(),
            },
        ),
        Commands::SlideTrim {
            project,
            frame,
            side,
        } => run_edit(
            &project,
            EditCommand::SlideTrim {
                frame,
                side: side.into(),
            },
        ),
        Commands::RippleTrim {
            project,
            frame,
            side,
        } => run_edit(
            &project,
            EditCommand::RippleTrim {
                frame,
                side: side.into(),
            },
        ),
        Commands::Uncut {
            project,
            strip,
            side,
        } => run_edit(
            &project,
            EditCommand::Uncut {
                strip,
                side: side.into(),
            },
        ),
        Commands::Delete { project, ripple } => {
            run_edit(&project, EditCommand::Delete { ripple })
        }
        Commands::Fade {
            project,
            length,
            direction,
        } => run_edit(
            &project,
            EditCommand::Fade {
                length,
                direction: direction.map(Into::into),
            },
        ),
        Commands::Crossfade {
            project,
            strip,
            length,
            smart,
        } => run_edit(
            &project,
            EditCommand::Crossfade {
                strip,
                length,
                smart,
            },
        ),
        Commands::Parent {
            project,
            parent,
            children,
            clear,
            clear_children,
        } => parent_command(&project, parent, children, clear, clear_children),
        Commands::Marker { project, action } => {
            let command = match action {
                MarkerAction::Add { frame, label } => EditCommand::AddMarker { frame, label },
                MarkerAction::Remove { label } => EditCommand::RemoveMarker { label },
                MarkerAction::In { frame } => EditCommand::SetInPoint { frame },
                MarkerAction::Out { frame } => EditCommand::SetOutPoint { frame },
                MarkerAction::Clear => EditCommand::ClearInOut,
            };
            run_edit(&project, command)
        }
        Commands::Rename { project, from, to } => {
            run_edit(&project, EditCommand::Rename { from, to })
        }
        Commands::Inspect { project } => inspect_command(&project),
        Commands::Timecode {
            value,
            fps,
            levels,
            centiseconds,
        } => timecode_command(&value, fps, levels, centiseconds),
    }
}

fn new_command(project: &Path, fps: u32) -> Result<()> {
    let doc = Project {
        timeline: Timeline::new(Fps::new(fps, 1)),
        curves: CurveBank::new(),
        prefs: Prefs::default(),
    };
    doc.save(project)?;
    info!("created project: {}", project.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn add_command(
    project: &Path,
    name: String,
    start: Frame,
    end: Frame,
    kind: KindArg,
    path: Option<String>,
    directory: Option<String>,
    filename: Option<String>,
    scene: Option<String>,
    media_duration: Option<Frame>,
    channel: i64,
    select: bool,
) -> Result<()> {
    if end <= start {
        anyhow::bail!("end frame must be after start frame");
    }
    let media_duration = media_duration.unwrap_or(end - start);
    let kind = match kind {
        KindArg::Movie => StripKind::Movie {
            path: path.context("--path is required for movie strips")?,
            media_duration,
        },
        KindArg::Sound => StripKind::Sound {
            path: path.context("--path is required for sound strips")?,
            media_duration,
        },
        KindArg::Image => StripKind::Image {
            directory: directory.unwrap_or_default(),
            filename: filename.context("--filename is required for image strips")?,
        },
        KindArg::Scene => StripKind::Scene {
            scene: scene.context("--scene is required for scene strips")?,
        },
        KindArg::Meta => StripKind::Meta,
    };

    let mut doc = Project::load(project)?;
    let mut strip = Strip::new(name, kind, start, end, channel.max(1));
    strip.select = select;
    let stored = doc.timeline.add(strip);
    doc.save(project)?;
    info!("added strip '{stored}'");
    Ok(())
}

fn select_command(
    project: &Path,
    names: Vec<String>,
    left: bool,
    right: bool,
    add: bool,
    children: bool,
) -> Result<()> {
    let mut doc = Project::load(project)?;
    if !add {
        doc.timeline.deselect_all();
    }
    for name in &names {
        match doc.timeline.get_mut(name) {
            Some(strip) => {
                if left {
                    strip.select_left_handle = true;
                }
                if right {
                    strip.select_right_handle = true;
                }
                if !left && !right {
                    strip.select = true;
                }
            }
            None => warn!("no strip named '{name}'"),
        }
    }
    if children {
        expand_selection_to_children(&mut doc.timeline.strips);
    }
    let selected = doc.timeline.selected_names();
    doc.save(project)?;
    info!("selected: {}", selected.join(", "));
    Ok(())
}

fn parent_command(
    project: &Path,
    parent: Option<String>,
    children: Vec<String>,
    clear: bool,
    clear_children: bool,
) -> Result<()> {
    let command = if clear {
        // With --clear the positional "parent" is just another child.
        let mut children = children;
        if let Some(first) = parent {
            children.insert(0, first);
        }
        EditCommand::ClearParent { children }
    } else if clear_children {
        EditCommand::ClearChildren {
            parent: parent.context("--clear-children requires a parent name")?,
        }
    } else {
        EditCommand::SetParent {
            parent: parent.context("a parent name is required")?,
            children,
        }
    };
    run_edit(project, command)
}

fn run_edit(project: &Path, command: EditCommand) -> Result<()> {
    let mut doc = Project::load(project)?;
    let report = apply_command(&mut doc.timeline, &mut doc.curves, &doc.prefs, command)?;
    for warning in &report.warnings {
        warn!("{warning}");
    }
    match report.status {
        OpStatus::Completed => info!("{} completed", report.action),
        OpStatus::Cancelled => info!("{} cancelled: preconditions not met", report.action),
    }
    doc.save(project)
}

fn inspect_command(project: &Path) -> Result<()> {
    let doc = Project::load(project)?;
    let tl = &doc.timeline;
    println!(
        "{} strips, cursor at {}",
        tl.strips.len(),
        timecode(tl.cursor, tl.fps, 0, SubSecondMode::Frames)
    );

    let mut strips: Vec<&Strip> = tl.strips.iter().collect();
    strips.sort_by_key(|s| (s.channel, s.frame_final_start));
    for s in strips {
        let mut flags = String::new();
        if s.select {
            flags.push('S');
        }
        if s.select_left_handle {
            flags.push('[');
        }
        if s.select_right_handle {
            flags.push(']');
        }
        if s.lock {
            flags.push('L');
        }
        if s.mute {
            flags.push('M');
        }
        let parent = s
            .parent
            .as_deref()
            .map(|p| format!(" -> {p}"))
            .unwrap_or_default();
        println!(
            "  ch{:<3} {:>7}..{:<7} {:<24} {:<4}{}",
            s.channel, s.frame_final_start, s.frame_final_end, s.name, flags, parent
        );
    }

    for m in tl.markers.markers_sorted() {
        println!(
            "  marker {:>7} {:?} '{}'",
            m.frame, m.marker_type, m.label
        );
    }
    if let Some((start, end)) = tl.markers.get_in_out_range() {
        println!("  in/out range: {start}..{end}");
    }
    Ok(())
}

fn timecode_command(value: &str, fps: u32, levels: u8, centiseconds: bool) -> Result<()> {
    let fps = Fps::new(fps, 1);
    if let Ok(frame) = value.parse::<Frame>() {
        let mode = if centiseconds {
            SubSecondMode::Centiseconds
        } else {
            SubSecondMode::Frames
        };
        println!("{}", timecode(frame, fps, levels, mode));
    } else {
        let tc = Timecode::parse(value, fps).map_err(|e| anyhow::anyhow!(e))?;
        println!("{}", tc.to_frame(fps));
    }
    Ok(())
}
