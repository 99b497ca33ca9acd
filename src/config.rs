//! Connectivity configuration.
//!
//! Credentials and endpoints for every supported modem family. The
//! storage layout is owned elsewhere; this module only defines the
//! record, its validation, console provisioning (`set_field`) and the
//! serialized forms handed to storage (postcard) and to the console
//! (JSON).

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Capacity of every MQTT / Wi-Fi string field.
pub const FIELD_MAX_LEN: usize = 63;

/// LoRaWAN EUIs are 8 bytes (16 hex digits).
pub const EUI_HEX_LEN: usize = 16;

/// LoRaWAN application key is 16 bytes (32 hex digits).
pub const APP_KEY_HEX_LEN: usize = 32;

/// ISO 3166-1 alpha-2 regulatory domain.
pub const COUNTRY_CODE_LEN: usize = 2;

/// Highest 2.4 GHz channel number.
pub const WIFI_CHANNEL_MAX: u16 = 14;

// ---------------------------------------------------------------------------
// MQTT transport scheme
// ---------------------------------------------------------------------------

/// ESP-AT `MQTTUSERCFG` scheme codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MqttScheme {
    Tcp = 1,
    TlsNoCert = 2,
    TlsVerifyServer = 3,
    TlsProvideClient = 4,
    TlsMutual = 5,
    Ws = 6,
    WssNoCert = 7,
    WssVerifyServer = 8,
    WssProvideClient = 9,
    WssMutual = 10,
}

impl MqttScheme {
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => Self::Tcp,
            2 => Self::TlsNoCert,
            3 => Self::TlsVerifyServer,
            4 => Self::TlsProvideClient,
            5 => Self::TlsMutual,
            6 => Self::Ws,
            7 => Self::WssNoCert,
            8 => Self::WssVerifyServer,
            9 => Self::WssProvideClient,
            10 => Self::WssMutual,
            _ => return None,
        })
    }

    pub const fn code(self) -> u16 {
        self as u16
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: String<FIELD_MAX_LEN>,
    pub pwd: String<FIELD_MAX_LEN>,
    /// Regulatory domain handed to the radio before it scans.
    pub country: String<COUNTRY_CODE_LEN>,
    /// First channel the station may use.
    pub schan: u16,
    /// Number of channels from `schan`.
    pub nchan: u16,
}

impl Default for WifiConfig {
    fn default() -> Self {
        let mut country = String::new();
        let _ = country.push_str("GB");
        Self {
            ssid: String::new(),
            pwd: String::new(),
            country,
            schan: 1,
            nchan: 13,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    /// Broker host name or address.
    pub addr: String<FIELD_MAX_LEN>,
    pub user: String<FIELD_MAX_LEN>,
    pub pwd: String<FIELD_MAX_LEN>,
    /// CA reference (certificate slot name); empty when unused.
    pub ca: String<FIELD_MAX_LEN>,
    /// [`MqttScheme`] code.
    pub scheme: u16,
    pub port: u16,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            user: String::new(),
            pwd: String::new(),
            ca: String::new(),
            scheme: MqttScheme::WssNoCert.code(),
            port: 443,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoraConfig {
    pub dev_eui: String<EUI_HEX_LEN>,
    pub app_eui: String<EUI_HEX_LEN>,
    pub app_key: String<APP_KEY_HEX_LEN>,
}

/// Complete connectivity configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommsConfig {
    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub lora: LoraConfig,
}

impl CommsConfig {
    /// Check every field. The engine will not leave `Off` with an
    /// invalid configuration.
    pub fn validate(&self) -> Result<()> {
        printable("wifi_ssid", &self.wifi.ssid)?;
        printable("wifi_pwd", &self.wifi.pwd)?;
        country_code(&self.wifi.country)?;
        channel("schan", self.wifi.schan)?;
        channel("nchan", self.wifi.nchan)?;
        printable("mqtt_addr", &self.mqtt.addr)?;
        printable("mqtt_user", &self.mqtt.user)?;
        printable("mqtt_pwd", &self.mqtt.pwd)?;
        printable("mqtt_ca", &self.mqtt.ca)?;
        if MqttScheme::from_code(self.mqtt.scheme).is_none() {
            return Err(ConfigError::OutOfRange("mqtt_scheme").into());
        }
        if self.mqtt.port == 0 {
            return Err(ConfigError::OutOfRange("mqtt_port").into());
        }
        hex_or_empty("lora_dev_eui", &self.lora.dev_eui, EUI_HEX_LEN)?;
        hex_or_empty("lora_app_eui", &self.lora.app_eui, EUI_HEX_LEN)?;
        hex_or_empty("lora_app_key", &self.lora.app_key, APP_KEY_HEX_LEN)?;
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Set one field by its console name (`mqtt_addr`, `mqtt_port`, ...).
    ///
    /// The value is checked before it is stored; on error the record is
    /// left untouched.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "wifi_ssid" => set_str("wifi_ssid", &mut self.wifi.ssid, value),
            "wifi_pwd" => set_str("wifi_pwd", &mut self.wifi.pwd, value),
            "country" => {
                country_code(value)?;
                set_str("country", &mut self.wifi.country, value)
            }
            "schan" => {
                self.wifi.schan = channel("schan", parse_u16("schan", value)?)?;
                Ok(())
            }
            "nchan" => {
                self.wifi.nchan = channel("nchan", parse_u16("nchan", value)?)?;
                Ok(())
            }
            "mqtt_addr" => set_str("mqtt_addr", &mut self.mqtt.addr, value),
            "mqtt_user" => set_str("mqtt_user", &mut self.mqtt.user, value),
            "mqtt_pwd" => set_str("mqtt_pwd", &mut self.mqtt.pwd, value),
            "mqtt_ca" => set_str("mqtt_ca", &mut self.mqtt.ca, value),
            "mqtt_scheme" => {
                let code = parse_u16("mqtt_scheme", value)?;
                MqttScheme::from_code(code).ok_or(ConfigError::OutOfRange("mqtt_scheme"))?;
                self.mqtt.scheme = code;
                Ok(())
            }
            "mqtt_port" => {
                let port = parse_u16("mqtt_port", value)?;
                if port == 0 {
                    return Err(ConfigError::OutOfRange("mqtt_port").into());
                }
                self.mqtt.port = port;
                Ok(())
            }
            "lora_dev_eui" => set_hex("lora_dev_eui", &mut self.lora.dev_eui, value, EUI_HEX_LEN),
            "lora_app_eui" => set_hex("lora_app_eui", &mut self.lora.app_eui, value, EUI_HEX_LEN),
            "lora_app_key" => {
                set_hex("lora_app_key", &mut self.lora.app_key, value, APP_KEY_HEX_LEN)
            }
            _ => Err(ConfigError::UnknownField.into()),
        }
    }

    /// JSON dump for the console.
    pub fn to_json(&self) -> Result<std::string::String> {
        serde_json::to_string(self).map_err(|_| ConfigError::Encode.into())
    }

    /// Compact blob for persistent storage.
    pub fn to_bytes(&self) -> Result<std::vec::Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| ConfigError::Encode.into())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode.into())
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Printable ASCII (space through tilde). Empty strings are allowed.
pub fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn printable(field: &'static str, s: &str) -> Result<()> {
    if is_printable_ascii(s) {
        Ok(())
    } else {
        Err(ConfigError::NotPrintable(field).into())
    }
}

fn country_code(s: &str) -> Result<()> {
    if s.len() == COUNTRY_CODE_LEN && s.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange("country").into())
    }
}

fn channel(field: &'static str, value: u16) -> Result<u16> {
    if (1..=WIFI_CHANNEL_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange(field).into())
    }
}

fn hex_or_empty(field: &'static str, s: &str, width: usize) -> Result<()> {
    if s.is_empty() || (s.len() == width && s.bytes().all(|b| b.is_ascii_hexdigit())) {
        Ok(())
    } else {
        Err(ConfigError::BadHex(field).into())
    }
}

fn parse_u16(field: &'static str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ConfigError::OutOfRange(field).into())
}

fn set_str<const N: usize>(field: &'static str, dest: &mut String<N>, value: &str) -> Result<()> {
    printable(field, value)?;
    let mut next = String::new();
    next.push_str(value).map_err(|()| ConfigError::TooLong(field))?;
    *dest = next;
    Ok(())
}

fn set_hex<const N: usize>(
    field: &'static str,
    dest: &mut String<N>,
    value: &str,
    width: usize,
) -> Result<()> {
    hex_or_empty(field, value, width)?;
    set_str(field, dest, value)
}
