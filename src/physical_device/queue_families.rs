use ash::vk::{QueueFamilyProperties, QueueFlags};

/// A queue family together with its position in the adapter's list.
#[derive(Debug, Clone, Copy)]
pub struct QueueFamily {
    /// position in the driver's enumeration, used when requesting queues
    pub index: u32,
    pub properties: QueueFamilyProperties,
}

impl QueueFamily {
    pub fn supports(&self, flags: QueueFlags) -> bool {
        self.properties.queue_flags.contains(flags)
    }
}

/// Returns the first family, in enumeration order, capable of graphics work.
pub fn find_graphics_family(queue_families: &[QueueFamily]) -> Option<&QueueFamily> {
    queue_families
        .iter()
        .find(|queue_family| queue_family.supports(QueueFlags::GRAPHICS))
}

/// Formats a queue family for the startup report, e.g.
/// `graphics,compute,timestamp=64,im.align=1x1x1,16`.
pub fn describe_queue_family(queue_family: &QueueFamily) -> String {
    let properties = &queue_family.properties;
    let mut tag = String::new();
    for (flag, name) in [
        (QueueFlags::GRAPHICS, "graphics"),
        (QueueFlags::COMPUTE, "compute"),
        (QueueFlags::SPARSE_BINDING, "sparse-binding"),
        (QueueFlags::PROTECTED, "protected"),
    ] {
        if properties.queue_flags.contains(flag) {
            tag.push_str(name);
            tag.push(',');
        }
    }
    let granularity = properties.min_image_transfer_granularity;
    tag.push_str(&format!(
        "timestamp={},im.align={}x{}x{},{}",
        properties.timestamp_valid_bits,
        granularity.width,
        granularity.height,
        granularity.depth,
        properties.queue_count
    ));
    tag
}
