//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements                      | Connects to              |
//! |-------------|---------------------------------|--------------------------|
//! | `uart`      | Transport                       | ESP-IDF UART1 + reader   |
//! | `time`      | Clock                           | embassy-time / std timer |
//! | `nvs`       | ConfigStore                     | NVS / in-memory blob     |
//! | `log_ack`   | CommandProcessor, AckHook       | Serial log output        |
//! | `device_id` | (topic header)                  | eFuse MAC                |

pub mod device_id;
pub mod log_ack;
pub mod nvs;
pub mod time;
#[cfg(target_os = "espidf")]
pub mod uart;
