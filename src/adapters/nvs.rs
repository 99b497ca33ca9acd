//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigStore`] by keeping the postcard-encoded
//! [`CommsConfig`] as one blob.
//!
//! - Validation: a record that fails `validate()` is never written.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - The simulation backend is an in-memory map (dev/test only).

use log::{info, warn};

use crate::app::ports::ConfigStore;
use crate::config::CommsConfig;
use crate::error::{ConfigError, Result};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const CONFIG_NAMESPACE: &[u8] = b"osm_comms\0";
#[cfg(target_os = "espidf")]
const CONFIG_KEY: &[u8] = b"comms_cfg\0";

/// Larger than any encoded record (every field at capacity).
#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 1024;

pub struct NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    blob: Option<std::vec::Vec<u8>>,
}

impl NvsConfigStore {
    /// Initialise NVS flash. On first boot or after a version mismatch
    /// the partition is erased and re-initialised.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self> {
        // SAFETY: called once from the main task before any other NVS use.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
            warn!("NVS: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                return Err(ConfigError::Storage.into());
            }
        } else if ret != ESP_OK {
            return Err(ConfigError::Storage.into());
        }
        info!("NVS: initialised");
        Ok(Self {})
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self> {
        info!("NVS: simulation backend");
        Ok(Self { blob: None })
    }

    /// Open the config namespace, run `f` with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_handle<T>(
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> core::result::Result<T, esp_err_t>,
    ) -> core::result::Result<T, esp_err_t> {
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let ret = unsafe { nvs_open(CONFIG_NAMESPACE.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }
}

impl ConfigStore for NvsConfigStore {
    #[cfg(not(target_os = "espidf"))]
    fn load(&self) -> Result<Option<CommsConfig>> {
        self.blob
            .as_deref()
            .map(CommsConfig::from_bytes)
            .transpose()
    }

    #[cfg(target_os = "espidf")]
    fn load(&self) -> Result<Option<CommsConfig>> {
        let result = Self::with_handle(false, |handle| {
            let mut buf = [0u8; MAX_BLOB_SIZE];
            let mut size = buf.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    CONFIG_KEY.as_ptr().cast(),
                    buf.as_mut_ptr().cast(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf[..size].to_vec())
        });
        match result {
            Ok(bytes) => {
                info!("NVS: loaded config ({} bytes)", bytes.len());
                CommsConfig::from_bytes(&bytes).map(Some)
            }
            Err(ESP_ERR_NVS_NOT_FOUND) => Ok(None),
            Err(e) => {
                warn!("NVS: read error {}", e);
                Err(ConfigError::Storage.into())
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn save(&mut self, config: &CommsConfig) -> Result<()> {
        config.validate()?;
        self.blob = Some(config.to_bytes()?);
        info!("NVS: config saved (simulation)");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn save(&mut self, config: &CommsConfig) -> Result<()> {
        config.validate()?;
        let bytes = config.to_bytes()?;
        let result = Self::with_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    CONFIG_KEY.as_ptr().cast(),
                    bytes.as_ptr().cast(),
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            match unsafe { nvs_commit(handle) } {
                ESP_OK => Ok(()),
                e => Err(e),
            }
        });
        match result {
            Ok(()) => {
                info!("NVS: config saved ({} bytes)", bytes.len());
                Ok(())
            }
            Err(e) => {
                warn!("NVS: write error {}", e);
                Err(ConfigError::Storage.into())
            }
        }
    }
}
