// MiOS cloud wire types
//
// The account and device servers are inconsistent about types: the same
// field arrives as a number from one server and as a quoted string from
// another. Every scalar here therefore goes through a lenient reader, and
// unknown fields are kept in `extra`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const DEVICE_ASSIGNED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Response of `GET /autha/auth/username/{user}`.
#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponse {
    #[serde(rename = "Identity")]
    pub identity: String,
    #[serde(rename = "IdentitySignature")]
    pub identity_signature: String,
    #[serde(rename = "Server_Account")]
    pub server_account: String,
}

/// The decoded payload of the base64 identity token.
#[derive(Debug, Deserialize)]
pub(crate) struct IdentityClaims {
    #[serde(rename = "PK_Account", deserialize_with = "lenient_u64")]
    pub account_id: u64,
}

/// Response of `GET /account/account/account/{id}/devices`.
#[derive(Debug, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(rename = "Devices", default)]
    pub devices: Vec<AccountDevice>,
}

/// A hub registered to a MiOS account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDevice {
    /// `PK_Device`, also the hub's serial number.
    #[serde(rename = "PK_Device", deserialize_with = "lenient_string")]
    pub device_id: String,
    #[serde(rename = "PK_DeviceType", default, deserialize_with = "lenient_u32")]
    pub device_type: u32,
    #[serde(rename = "PK_DeviceSubType", default, deserialize_with = "lenient_string")]
    pub device_sub_type: String,
    #[serde(rename = "MacAddress", default, deserialize_with = "lenient_string")]
    pub mac_address: String,
    /// Device server that answers the extended info request.
    #[serde(rename = "Server_Device", default, deserialize_with = "lenient_string")]
    pub server_device: String,
    #[serde(rename = "Server_Device_Alt", default, deserialize_with = "lenient_string")]
    pub server_device_alt: String,
    #[serde(rename = "PK_Installation", default, deserialize_with = "lenient_string")]
    pub installation: String,
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "DeviceAssigned", default, deserialize_with = "assigned_at")]
    pub device_assigned: Option<NaiveDateTime>,
    #[serde(rename = "Using_2G", default, deserialize_with = "lenient_bool")]
    pub using_2g: bool,
    #[serde(rename = "Blocked", default, deserialize_with = "lenient_bool")]
    pub blocked: bool,
}

/// Extended hub information from the device server.
///
/// `ui_version` drives the connection choice: below 7 the hub is reached
/// through the legacy forwarder, otherwise through `server_relay`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "PK_Device", deserialize_with = "lenient_string")]
    pub device_id: String,
    #[serde(rename = "Server_Relay", default, deserialize_with = "lenient_opt_string")]
    pub server_relay: Option<String>,
    #[serde(rename = "MacAddress", default, deserialize_with = "lenient_string")]
    pub mac_address: String,
    #[serde(rename = "Using_2G", default, deserialize_with = "lenient_bool")]
    pub using_2g: bool,
    #[serde(rename = "ExternalIP", default, deserialize_with = "lenient_string")]
    pub external_ip: String,
    #[serde(rename = "AccessiblePort", default, deserialize_with = "lenient_u32")]
    pub accessible_port: u32,
    #[serde(rename = "InternalIP", default, deserialize_with = "lenient_string")]
    pub internal_ip: String,
    #[serde(rename = "LocalPort", default, deserialize_with = "lenient_u32")]
    pub local_port: u32,
    #[serde(rename = "FirmwareVersion", default, deserialize_with = "lenient_string")]
    pub firmware_version: String,
    #[serde(rename = "Server_Device", default, deserialize_with = "lenient_string")]
    pub server_device: String,
    #[serde(rename = "Timezone", default, deserialize_with = "lenient_string")]
    pub timezone: String,
    #[serde(rename = "Platform", default, deserialize_with = "lenient_string")]
    pub platform: String,
    #[serde(rename = "HasWifi", default, deserialize_with = "lenient_bool")]
    pub has_wifi: bool,
    #[serde(rename = "HasAlarmPanel", default, deserialize_with = "lenient_bool")]
    pub has_alarm_panel: bool,
    #[serde(rename = "UI", default, deserialize_with = "lenient_u32")]
    pub ui_version: u32,
    #[serde(rename = "LinuxFirmware", default, deserialize_with = "lenient_u32")]
    pub linux_firmware: u32,
    /// Every other field the device server reported.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl DeviceInfo {
    /// Whether this hub speaks the UI7 relay protocol.
    pub fn uses_relay(&self) -> bool {
        self.ui_version >= super::RELAY_MIN_UI_VERSION
    }
}

// ── Lenient scalar readers ──────────────────────────────────────────

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(d)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("expected unsigned integer, got {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("expected numeric string, got {s:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "expected number or numeric string, got {other}"
        ))),
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|v| v != 0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True"),
        _ => false,
    })
}

fn assigned_at<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
    Ok(lenient_opt_string(d)?
        .and_then(|s| NaiveDateTime::parse_from_str(&s, DEVICE_ASSIGNED_FORMAT).ok()))
}
