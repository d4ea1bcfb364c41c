// NVIDIA GPU load using NVML
use log::debug;
use nvml_wrapper::error::NvmlError;
use nvml_wrapper::Nvml;

/// First NVIDIA GPU. Only global load is exposed; load is never attributed to a process.
pub struct NvidiaGpu {
    nvml: Nvml,
    device_index: u32,
    cached_name: String,
}

impl NvidiaGpu {
    /// Returns Err if NVIDIA drivers are not installed or NVML fails to initialize
    pub fn new() -> Result<Self, NvmlError> {
        let nvml = Nvml::init()?;
        let device = nvml.device_by_index(0)?;
        let cached_name = device.name()?;

        Ok(Self {
            nvml,
            device_index: 0,
            cached_name,
        })
    }

    /// Probe for a GPU, logging instead of failing
    pub fn detect() -> Option<Self> {
        match Self::new() {
            Ok(gpu) => {
                debug!("NVIDIA GPU detected: {}", gpu.cached_name);
                Some(gpu)
            }
            Err(e) => {
                debug!("No NVIDIA GPU detected or NVML not available: {}", e);
                None
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.cached_name
    }

    /// Current utilization in percent
    pub fn load_percent(&self) -> Result<f32, NvmlError> {
        let device = self.nvml.device_by_index(self.device_index)?;
        let utilization = device.utilization_rates()?;
        Ok(utilization.gpu as f32)
    }
}
