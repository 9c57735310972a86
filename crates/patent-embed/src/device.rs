//! Compute device for the local embedding model.

use candle_core::Device;
use tracing::info;

/// Metal when built with the `metal` feature and a GPU is present, else CPU.
/// `APP_EMBED_DEVICE=cpu` forces the CPU.
pub fn select_device() -> Device {
    let forced_cpu = std::env::var("APP_EMBED_DEVICE").is_ok_and(|v| v.eq_ignore_ascii_case("cpu"));
    #[cfg(feature = "metal")]
    {
        if !forced_cpu {
            match Device::new_metal(0) {
                Ok(dev) => {
                    info!(device = "metal", "embedding device selected");
                    return dev;
                }
                Err(e) => tracing::warn!(error = %e, "Metal unavailable, falling back to CPU"),
            }
        }
    }
    info!(device = "cpu", forced = forced_cpu, "embedding device selected");
    Device::Cpu
}
