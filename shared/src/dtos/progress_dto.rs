use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{graphics::color::DisplayColor, models::tile::Tile};

/// A tile currently being rendered, as reported to status consumers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressDto {
    pub worker_name: String,
    pub tile: Tile,
    pub started_at: DateTime<Utc>,
    pub color: DisplayColor,
}
