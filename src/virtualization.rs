//! Queue count virtualization.
//!
//! Every queue family is advertised with at least [`MIN_QUEUE_COUNT`] queues. Device creation
//! only ever asks the driver for the queues that physically exist, and queue indices past the
//! physical count all resolve to the last physical queue of their family. Aliased queues stay
//! valid; the layer serializes work submitted through them.
use ash::vk;

/// Minimum number of queues advertised for every queue family.
pub const MIN_QUEUE_COUNT: u32 = 16;

pub fn advertised_queue_count(physical: u32) -> u32 {
    physical.max(MIN_QUEUE_COUNT)
}

/// Raises the reported queue count of each family to [`MIN_QUEUE_COUNT`].
pub fn inflate_queue_families(families: &mut [vk::QueueFamilyProperties]) {
    for family in families {
        family.queue_count = advertised_queue_count(family.queue_count);
    }
}

/// Same as [`inflate_queue_families`] for the extensible query.
pub fn inflate_queue_families2(families: &mut [vk::QueueFamilyProperties2]) {
    for family in families {
        let properties = &mut family.queue_family_properties;
        properties.queue_count = advertised_queue_count(properties.queue_count);
    }
}

/// Copies `requests`, capping each queue count at what the family physically offers.
///
/// Families outside `physical` are left alone for the driver to reject.
pub fn clamp_queue_requests<'a>(requests: &[vk::DeviceQueueCreateInfo<'a>], physical: &[u32]) -> Vec<vk::DeviceQueueCreateInfo<'a>> {
    requests
        .iter()
        .map(|request| {
            let mut clamped = *request;

            if let Some(&available) = physical.get(request.queue_family_index as usize) {
                if request.queue_count > available {
                    log::debug!(
                        "family {}: clamping {} requested queues to {}",
                        request.queue_family_index,
                        request.queue_count,
                        available
                    );
                    clamped.queue_count = available;
                }
            }

            clamped
        })
        .collect()
}

/// Maps an application queue index onto a physical one.
pub fn physical_queue_index(physical: &[u32], family: u32, index: u32) -> u32 {
    match physical.get(family as usize) {
        Some(&available) if index >= available && available > 0 => {
            log::trace!("family {family}: queue {index} aliases queue {}", available - 1);
            available - 1
        }
        _ => index,
    }
}
