//!
//! # Vulkan Queue Mux
//!
//! A Vulkan layer that makes every queue family look like it has at least [`MIN_QUEUE_COUNT`](virtualization::MIN_QUEUE_COUNT) queues, built on [ash](https://github.com/ash-rs/ash).
//!
//! - Applications (or translation layers) that insist on many queues run on hardware exposing only one or two
//! - Device creation only asks the driver for queues that exist; extra queue indices alias onto the last real one
//! - Work submitted through aliased queues is serialized per physical queue, everything else passes straight through
//!
//!
//! ## How it works
//!
//! The loader resolves six exported symbols (`vkEnumerate*Properties`, `vkGetInstanceProcAddr`, `vkGetDeviceProcAddr`).
//! Everything else is reached through the two resolvers, which either hand out our own implementation or forward to
//! the next layer captured from the creation chain. Sessions for instances, devices and queues live in a [`Registry`].
//!
//!
//! ## FAQ
//!
//! - **Is this free?**
//!
//!     Queues that are not aliased only pay for a table lookup and an uncontended lock. Aliased queues are serialized
//!     against each other, so an application that expected 16 parallel queues on a single-queue family will see them
//!     take turns.
//!
//! - **How do I see what it does?**
//!
//!     Set `RUST_LOG=vulkan_queue_mux=debug` to log clamped queue requests and lazily registered queues.
//!
//!
//! ## License
//!
//! - BSD 2-Clause
//!
mod chain;
mod device;
mod dispatch;
mod error;
mod exports;
mod identity;
mod identitymap;
mod instance;
mod layer;
mod lock;
#[cfg(test)]
mod mock;
mod queue;
mod registry;
mod session;
pub mod virtualization;

pub use chain::{
    LayerDeviceCreateInfo, LayerDeviceLink, LayerDevicePayload, LayerFunction, LayerInstanceCreateInfo, LayerInstanceLink,
    LayerInstancePayload,
};
pub use error::{Error, Variant};
pub use exports::{
    vkEnumerateDeviceExtensionProperties, vkEnumerateDeviceLayerProperties, vkEnumerateInstanceExtensionProperties,
    vkEnumerateInstanceLayerProperties, vkGetDeviceProcAddr, vkGetInstanceProcAddr,
};
pub use identity::Identity;
pub use identitymap::IdentityMap;
pub use layer::{LAYER_DESCRIPTION, LAYER_NAME};
pub use lock::{Lock, LockGuard};
pub use registry::Registry;

/// Installs the logger once, defaulting to warnings; `RUST_LOG` overrides.
pub(crate) fn init_logging() {
    _ = env_logger::builder()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .try_init();
}
