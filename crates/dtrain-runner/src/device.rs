//! Compute device selection.

use std::path::PathBuf;

use dtrain_core::{Device, DeviceSelector};

/// Reports whether CUDA training is possible on this machine.
pub trait GpuProbe {
    fn cuda_available(&self) -> bool;
}

/// Detects an NVIDIA driver through procfs, honouring `CUDA_VISIBLE_DEVICES`.
#[derive(Debug, Clone)]
pub struct NvidiaProbe {
    driver_version_file: PathBuf,
    visible_devices: Option<String>,
}

impl NvidiaProbe {
    pub const DRIVER_VERSION_FILE: &'static str = "/proc/driver/nvidia/version";

    /// Probe using the real driver file and the current environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(
            Self::DRIVER_VERSION_FILE,
            std::env::var("CUDA_VISIBLE_DEVICES").ok(),
        )
    }

    #[must_use]
    pub fn new(driver_version_file: impl Into<PathBuf>, visible_devices: Option<String>) -> Self {
        Self {
            driver_version_file: driver_version_file.into(),
            visible_devices,
        }
    }
}

impl GpuProbe for NvidiaProbe {
    fn cuda_available(&self) -> bool {
        // An empty list or -1 hides every device.
        if let Some(devices) = &self.visible_devices {
            let devices = devices.trim();
            if devices.is_empty() || devices == "-1" {
                return false;
            }
        }
        self.driver_version_file.is_file()
    }
}

/// Turn a configured [`DeviceSelector`] into the device runs will use.
pub fn resolve_device(selector: DeviceSelector, probe: &impl GpuProbe) -> Device {
    let device = match selector {
        DeviceSelector::Cpu => Device::Cpu,
        DeviceSelector::Cuda => {
            if !probe.cuda_available() {
                tracing::warn!("cuda requested but no NVIDIA driver was detected");
            }
            Device::Cuda
        }
        DeviceSelector::Auto if probe.cuda_available() => Device::Cuda,
        DeviceSelector::Auto => Device::Cpu,
    };
    match device {
        Device::Cuda => tracing::info!("using CUDA"),
        Device::Cpu => tracing::info!("using CPU"),
    }
    device
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(bool);

    impl GpuProbe for Fixed {
        fn cuda_available(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn auto_follows_probe() {
        assert_eq!(resolve_device(DeviceSelector::Auto, &Fixed(true)), Device::Cuda);
        assert_eq!(resolve_device(DeviceSelector::Auto, &Fixed(false)), Device::Cpu);
    }

    #[test]
    fn explicit_selection_wins() {
        assert_eq!(resolve_device(DeviceSelector::Cpu, &Fixed(true)), Device::Cpu);
        assert_eq!(resolve_device(DeviceSelector::Cuda, &Fixed(false)), Device::Cuda);
    }

    #[test]
    fn nvidia_probe_reads_driver_file_and_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let driver = dir.path().join("version");

        assert!(!NvidiaProbe::new(&driver, None).cuda_available());

        std::fs::write(&driver, "NVRM version: 550.54").unwrap();
        assert!(NvidiaProbe::new(&driver, None).cuda_available());
        assert!(NvidiaProbe::new(&driver, Some("0,1".into())).cuda_available());
        assert!(!NvidiaProbe::new(&driver, Some("-1".into())).cuda_available());
        assert!(!NvidiaProbe::new(&driver, Some(String::new())).cuda_available());
    }
}
