//! Best-effort accelerator detection.
//!
//! Training runs on whatever Burn backend the binary was compiled
//! with; this module only reports what hardware is visible so a run
//! started on a GPU box without a GPU backend is easy to diagnose.

use tracing::info;

/// Check whether any discrete GPU is visible.
pub fn is_gpu_available() -> bool {
    has_nvidia_gpu() || has_amd_gpu()
}

fn has_nvidia_gpu() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/proc/driver/nvidia/version").exists()
            || std::path::Path::new("/dev/nvidia0").exists()
            || std::env::var("CUDA_VISIBLE_DEVICES").is_ok()
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

fn has_amd_gpu() -> bool {
    #[cfg(target_os = "linux")]
    {
        std::path::Path::new("/sys/module/amdgpu").exists()
            || std::env::var("HIP_VISIBLE_DEVICES").is_ok()
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Logs what accelerators are visible and which backend is in use.
pub fn log_device_report(backend_name: &str) {
    info!(
        "backend: {backend_name}, nvidia gpu: {}, amd gpu: {}",
        has_nvidia_gpu(),
        has_amd_gpu()
    );
    if is_gpu_available() && backend_name.contains("ndarray") {
        info!("a GPU is visible but the ndarray (CPU) backend is compiled in");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_probe_does_not_panic() {
        let _ = is_gpu_available();
        log_device_report("ndarray");
    }
}
