use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::models::ChannelId;

pub const DEFAULT_COLUMN_WIDTH: u32 = 256;
pub const MIN_COLUMN_WIDTH: u32 = 100;

/// Widths of timetable columns in px.
///
/// A record is created on the first resize of a channel and never removed.
/// Channels without a record have `DEFAULT_COLUMN_WIDTH`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ColumnWidths(IndexMap<ChannelId, u32>);

impl ColumnWidths {
    pub fn get(&self, channel_id: &ChannelId) -> u32 {
        self.0
            .get(channel_id)
            .copied()
            .unwrap_or(DEFAULT_COLUMN_WIDTH)
    }

    /// Applies a resize gesture and returns the new width.
    ///
    /// The width never goes below `MIN_COLUMN_WIDTH`.  There is no upper
    /// bound.
    pub fn change(&mut self, channel_id: ChannelId, delta: i32) -> u32 {
        let current = self.get(&channel_id);
        let width = (current as i64 + delta as i64)
            .max(MIN_COLUMN_WIDTH as i64)
            .min(u32::MAX as i64) as u32;
        self.0.insert(channel_id, width);
        width
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, u32)> {
        self.0.iter().map(|(id, width)| (id, *width))
    }

    // Records written by hand may violate the lower bound.
    pub(crate) fn normalize(mut self) -> Self {
        for width in self.0.values_mut() {
            *width = (*width).max(MIN_COLUMN_WIDTH);
        }
        self
    }
}

// </coverage:exclude>
