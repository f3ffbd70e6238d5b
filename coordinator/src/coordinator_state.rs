use std::sync::Arc;

use shared::{dtos::status_dto::StatusDto, models::resolution::Resolution};

use crate::{aggregator::PixelView, progress::ProgressTracker};

/// What status consumers may read while a render is running.
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    pub resolution: Resolution,
    pub total_tiles: usize,
    pub progress: Arc<ProgressTracker>,
    pub pixels: PixelView,
}

impl CoordinatorState {
    pub fn new(
        resolution: Resolution,
        total_tiles: usize,
        progress: Arc<ProgressTracker>,
        pixels: PixelView,
    ) -> Self {
        CoordinatorState {
            resolution,
            total_tiles,
            progress,
            pixels,
        }
    }

    pub fn status(&self) -> StatusDto {
        StatusDto {
            resolution: self.resolution,
            total_tiles: self.total_tiles,
            received_pixels: self.pixels.len(),
            in_flight: self
                .progress
                .snapshot()
                .iter()
                .map(|entry| entry.to_dto())
                .collect(),
        }
    }
}
