use serde::{Deserialize, Serialize};

use crate::{Fps, Frame, MarkerCollection, SequencerError, Strip};

/// The host scene store the engines operate on: an ordered strip
/// collection, named frame markers, and the playhead cursor. The
/// overlay frame is a secondary reference frame used as a display aid
/// while dragging a second edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub fps: Fps,
    pub strips: Vec<Strip>,
    #[serde(default)]
    pub markers: MarkerCollection,
    #[serde(default)]
    pub cursor: Frame,
    #[serde(default)]
    pub overlay_frame: Option<Frame>,
}

impl Timeline {
    pub fn new(fps: Fps) -> Self {
        Self {
            fps,
            strips: Vec::new(),
            markers: MarkerCollection::new(),
            cursor: 0,
            overlay_frame: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Strip> {
        self.strips.iter().find(|s| s.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Strip> {
        self.strips.iter_mut().find(|s| s.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.strips.iter().position(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Insert a strip, suffixing its name (`name.001` style) if the
    /// name is already taken. Children pointing at the old name are
    /// deliberately left alone: a suffixed insert is a duplicate, not a
    /// rename, so existing parent links still mean the original strip.
    ///
    /// Returns the name the strip was stored under.
    pub fn add(&mut self, mut strip: Strip) -> String {
        if self.contains(&strip.name) {
            strip.name = self.next_unique_name(&strip.name);
        }
        let name = strip.name.clone();
        self.strips.push(strip);
        name
    }

    pub fn remove(&mut self, name: &str) -> Option<Strip> {
        let idx = self.index_of(name)?;
        Some(self.strips.remove(idx))
    }

    /// Rename a strip and update every child's `parent` reference.
    ///
    /// The child fixup only applies to a genuine rename — the strip
    /// exists under `old` and nothing else claims `new`. A freshly
    /// duplicated strip that merely shares the old name lineage goes
    /// through `add`, which never rewrites parent links.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), SequencerError> {
        if old == new {
            return Ok(());
        }
        if self.contains(new) {
            return Err(SequencerError::StripExists(new.to_string()));
        }
        let idx = self
            .index_of(old)
            .ok_or_else(|| SequencerError::StripNotFound(old.to_string()))?;
        self.strips[idx].name = new.to_string();
        for strip in &mut self.strips {
            if strip.parent.as_deref() == Some(old) {
                strip.parent = Some(new.to_string());
            }
        }
        Ok(())
    }

    pub fn selected(&self) -> impl Iterator<Item = &Strip> {
        self.strips.iter().filter(|s| s.any_select())
    }

    pub fn selected_names(&self) -> Vec<String> {
        self.selected().map(|s| s.name.clone()).collect()
    }

    pub fn deselect_all(&mut self) {
        for strip in &mut self.strips {
            strip.deselect();
        }
    }

    fn next_unique_name(&self, base: &str) -> String {
        // Strip an existing numeric suffix so "clip.001" collides into
        // "clip.002", not "clip.001.001".
        let stem = match base.rsplit_once('.') {
            Some((stem, suffix)) if suffix.len() == 3 && suffix.chars().all(|c| c.is_ascii_digit()) => {
                stem
            }
            _ => base,
        };
        let mut n = 1u32;
        loop {
            let candidate = format!("{stem}.{n:03}");
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
