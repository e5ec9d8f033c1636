/// Named frame markers and the in/out edit range.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Frame;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MarkerId(pub Uuid);

impl MarkerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MarkerId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerType {
    #[default]
    Standard,

    /// Edit range start.
    In,

    /// Edit range end.
    Out,

    /// Chapter marker, kept through export.
    Chapter,

    /// Comment/note marker.
    Comment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub frame: Frame,
    pub label: String,

    #[serde(default)]
    pub marker_type: MarkerType,

    /// Color in hex format (e.g., "#FF0000").
    #[serde(default = "default_marker_color")]
    pub color: String,

    #[serde(default)]
    pub note: String,

    #[serde(default)]
    pub created_at: i64,
}

fn default_marker_color() -> String {
    "#4A9EFF".to_string()
}

impl Marker {
    pub fn new(frame: Frame, label: impl Into<String>) -> Self {
        Self {
            id: MarkerId::new(),
            frame,
            label: label.into(),
            marker_type: MarkerType::Standard,
            color: default_marker_color(),
            note: String::new(),
            created_at: Utc::now().timestamp(),
        }
    }

    pub fn with_type(mut self, marker_type: MarkerType) -> Self {
        self.marker_type = marker_type;
        self.color = match marker_type {
            MarkerType::In => "#00FF00".to_string(),
            MarkerType::Out => "#FF0000".to_string(),
            MarkerType::Chapter => "#FF00FF".to_string(),
            MarkerType::Comment => "#FFFF00".to_string(),
            MarkerType::Standard => default_marker_color(),
        };
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Markers for one timeline, kept in insertion order; queries sort on
/// demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerCollection {
    markers: Vec<Marker>,
}

impl MarkerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn add_marker(&mut self, marker: Marker) -> MarkerId {
        let id = marker.id;
        self.markers.push(marker);
        id
    }

    pub fn remove_marker(&mut self, id: &MarkerId) -> Option<Marker> {
        let idx = self.markers.iter().position(|m| m.id == *id)?;
        Some(self.markers.remove(idx))
    }

    /// Remove the first marker carrying `label`.
    pub fn remove_labeled(&mut self, label: &str) -> Option<Marker> {
        let idx = self.markers.iter().position(|m| m.label == label)?;
        Some(self.markers.remove(idx))
    }

    pub fn get_marker(&self, id: &MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Marker> {
        self.markers.iter_mut()
    }

    pub fn markers_sorted(&self) -> Vec<&Marker> {
        let mut markers: Vec<_> = self.markers.iter().collect();
        markers.sort_by_key(|m| m.frame);
        markers
    }

    pub fn markers_at(&self, frame: Frame, tolerance: Frame) -> Vec<&Marker> {
        self.markers
            .iter()
            .filter(|m| (m.frame - frame).abs() <= tolerance)
            .collect()
    }

    pub fn nearest_marker(&self, frame: Frame) -> Option<&Marker> {
        self.markers.iter().min_by_key(|m| (m.frame - frame).abs())
    }

    /// In/out pair when both points are placed.
    pub fn get_in_out_range(&self) -> Option<(Frame, Frame)> {
        let in_marker = self
            .markers
            .iter()
            .find(|m| m.marker_type == MarkerType::In)?;
        let out_marker = self
            .markers
            .iter()
            .find(|m| m.marker_type == MarkerType::Out)?;
        Some((in_marker.frame, out_marker.frame))
    }

    /// Place the in point, replacing any existing one.
    pub fn set_in_point(&mut self, frame: Frame) -> MarkerId {
        self.markers.retain(|m| m.marker_type != MarkerType::In);
        self.add_marker(Marker::new(frame, "In").with_type(MarkerType::In))
    }

    /// Place the out point, replacing any existing one.
    pub fn set_out_point(&mut self, frame: Frame) -> MarkerId {
        self.markers.retain(|m| m.marker_type != MarkerType::Out);
        self.add_marker(Marker::new(frame, "Out").with_type(MarkerType::Out))
    }

    pub fn clear_in_out(&mut self) {
        self.markers
            .retain(|m| m.marker_type != MarkerType::In && m.marker_type != MarkerType::Out);
    }

    pub fn clear(&mut self) {
        self.markers.clear();
    }
}
