use serde::{Deserialize, Serialize};

use crate::models::resolution::Resolution;

use super::progress_dto::ProgressDto;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusDto {
    pub resolution: Resolution,
    pub total_tiles: usize,
    pub received_pixels: usize,
    pub in_flight: Vec<ProgressDto>,
}
