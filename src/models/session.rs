//! ONNX Runtime session construction.

use std::path::Path;

use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch};
use ort::session::Session;

use crate::config::Device;
use crate::error::{GenError, Result};

/// Execution providers resolved for a device request.
pub struct ResolvedDevice {
    pub providers: Vec<ExecutionProviderDispatch>,
    /// What actually runs the sessions ("cpu" or "cuda").
    pub name: &'static str,
}

/// Resolves a device request to execution providers.
///
/// `Auto` asks ONNX Runtime whether CUDA is usable and falls back to CPU.
/// An empty provider list means ONNX Runtime's default CPU provider.
pub fn resolve_device(device: Device) -> ResolvedDevice {
    match device {
        Device::Cpu => ResolvedDevice {
            providers: Vec::new(),
            name: "cpu",
        },
        Device::Cuda => ResolvedDevice {
            providers: vec![CUDAExecutionProvider::default().build()],
            name: "cuda",
        },
        Device::Auto => {
            let cuda = CUDAExecutionProvider::default();
            if cuda.is_available().unwrap_or(false) {
                ResolvedDevice {
                    providers: vec![cuda.build()],
                    name: "cuda",
                }
            } else {
                ResolvedDevice {
                    providers: Vec::new(),
                    name: "cpu",
                }
            }
        }
    }
}

/// Options shared by every session of one model.
#[derive(Default)]
pub struct SessionOptions {
    pub providers: Vec<ExecutionProviderDispatch>,
    pub intra_threads: Option<usize>,
}

impl SessionOptions {
    /// Loads an ONNX graph from `path`.
    pub fn load(&self, path: &Path) -> Result<Session> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let mut builder = Session::builder()
            .map_err(|e| GenError::model_load_failed(format!("Failed to create session: {}", e)))?;

        if !self.providers.is_empty() {
            builder = builder
                .with_execution_providers(self.providers.clone())
                .map_err(|e| {
                    GenError::model_load_failed(format!("Failed to set execution providers: {}", e))
                })?;
        }

        if let Some(threads) = self.intra_threads {
            builder = builder.with_intra_threads(threads).map_err(|e| {
                GenError::model_load_failed(format!("Failed to set thread count: {}", e))
            })?;
        }

        tracing::debug!(file = %name, "loading onnx session");
        builder
            .commit_from_file(path)
            .map_err(|e| GenError::model_load_failed(format!("Failed to load {}: {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_uses_default_provider() {
        let resolved = resolve_device(Device::Cpu);
        assert!(resolved.providers.is_empty());
        assert_eq!(resolved.name, "cpu");
    }

    #[test]
    fn cuda_request_registers_provider() {
        let resolved = resolve_device(Device::Cuda);
        assert_eq!(resolved.providers.len(), 1);
        assert_eq!(resolved.name, "cuda");
    }
}
