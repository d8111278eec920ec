use ash::vk::PhysicalDeviceType;
use thiserror::Error;

use crate::config::SelectionPolicy;

use super::PhysicalDevice;

/// 0 means unsuitable; higher is better.
pub type SelectionScore = i64;

const DISCRETE_GPU_BONUS: SelectionScore = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No physical device available")]
    NoAdapter,
    #[error("None of the {candidates} physical devices is suitable")]
    NoSuitableAdapter { candidates: usize },
}

/// Rates an adapter. Adapters without geometry shaders are rejected with 0;
/// otherwise discrete GPUs get a fixed bonus and the maximum 2D image
/// dimension is added on top.
pub fn score(physical_device: &PhysicalDevice) -> SelectionScore {
    if !physical_device.supports_geometry_shader() {
        return 0;
    }
    let mut score = 0;
    if physical_device.device_type() == PhysicalDeviceType::DISCRETE_GPU {
        score += DISCRETE_GPU_BONUS;
    }
    score + SelectionScore::from(physical_device.max_image_dimension_2d())
}

/// Picks the adapter with the strictly highest non-zero score. Ties go to the
/// one enumerated first.
pub fn select_highest_scored(
    physical_devices: &[PhysicalDevice],
) -> Result<&PhysicalDevice, SelectionError> {
    if physical_devices.is_empty() {
        return Err(SelectionError::NoAdapter);
    }
    let mut best: Option<(&PhysicalDevice, SelectionScore)> = None;
    for physical_device in physical_devices {
        let score = score(physical_device);
        if score > 0 && best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((physical_device, score));
        }
    }
    best.map(|(physical_device, _)| physical_device)
        .ok_or(SelectionError::NoSuitableAdapter {
            candidates: physical_devices.len(),
        })
}

/// Under [`SelectionPolicy::FirstListed`] the first adapter is taken as is,
/// unless it scores 0.
pub fn select_physical_device(
    physical_devices: &[PhysicalDevice],
    policy: SelectionPolicy,
) -> Result<&PhysicalDevice, SelectionError> {
    match policy {
        SelectionPolicy::HighestScore => select_highest_scored(physical_devices),
        SelectionPolicy::FirstListed => {
            let physical_device = physical_devices.first().ok_or(SelectionError::NoAdapter)?;
            if score(physical_device) == 0 {
                return Err(SelectionError::NoSuitableAdapter {
                    candidates: physical_devices.len(),
                });
            }
            Ok(physical_device)
        }
    }
}
