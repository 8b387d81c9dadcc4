use crate::error::{EngineError, EngineResult};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

/// Resolves a host by name, falling back to the platform default.
pub fn get_host(host_name: Option<&str>) -> EngineResult<Host> {
    let Some(name) = host_name else {
        return Ok(cpal::default_host());
    };
    let host_id = cpal::available_hosts()
        .into_iter()
        .find(|id| id.name().eq_ignore_ascii_case(name))
        .ok_or_else(|| EngineError::hardware(format!("Audio host not available: {}", name)))?;
    cpal::host_from_id(host_id)
        .map_err(|e| EngineError::hardware(format!("Failed to get audio host: {}", e)))
}

pub fn get_output_devices(host: &Host) -> EngineResult<Vec<(String, Device)>> {
    let devices = host
        .output_devices()
        .map_err(|e| EngineError::hardware(format!("Failed to list output devices: {}", e)))?;
    let mut result = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            result.push((name, device));
        }
    }
    Ok(result)
}

pub fn output_device_names(host: &Host) -> EngineResult<Vec<String>> {
    Ok(get_output_devices(host)?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}

/// Finds the named output device, or the host default when `name` is `None`.
pub fn find_output_device(host: &Host, name: Option<&str>) -> EngineResult<Device> {
    match name {
        Some(name) => get_output_devices(host)?
            .into_iter()
            .find(|(device_name, _)| device_name == name)
            .map(|(_, device)| device)
            .ok_or_else(|| EngineError::hardware(format!("Output device not found: {}", name))),
        None => host
            .default_output_device()
            .ok_or_else(|| EngineError::hardware("No default output device")),
    }
}
