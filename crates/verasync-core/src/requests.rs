// ── Typed scene requests ──
//
// Building blocks for `id=scene&action=create`: timers, triggers and
// delayed device commands, assembled by `SceneBuilder` into a
// `SceneRequest` whose serde form is the JSON document Luup expects.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;

// ── Time of day ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolarEvent {
    Sunrise,
    Sunset,
}

/// When in the day a weekly or monthly timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    /// A fixed wall-clock time.
    At(NaiveTime),
    /// An offset before or after sunrise / sunset.
    Solar {
        event: SolarEvent,
        after: bool,
        offset: Duration,
    },
}

impl TimeOfDay {
    /// Luup notation: `H:m:s`, or `{+|-}H:m:s{R|T}` relative to sunrise (R)
    /// or sunset (T).
    fn luup(&self) -> String {
        match self {
            Self::At(time) => hms(time.hour(), time.minute(), time.second()),
            Self::Solar {
                event,
                after,
                offset,
            } => {
                let secs = offset.as_secs();
                let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
                let sign = if *after { '+' } else { '-' };
                let suffix = match event {
                    SolarEvent::Sunrise => 'R',
                    SolarEvent::Sunset => 'T',
                };
                format!("{sign}{h}:{m}:{s}{suffix}")
            }
        }
    }
}

fn hms(h: u32, m: u32, s: u32) -> String {
    format!("{h}:{m}:{s}")
}

// ── Timers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Minutes,
    Hours,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerSchedule {
    /// Every `every` minutes or hours.
    Interval { every: u32, unit: IntervalUnit },
    DaysOfWeek { days: Vec<Weekday>, time: TimeOfDay },
    /// Days are 1..=31.
    DaysOfMonth { days: Vec<u8>, time: TimeOfDay },
    Absolute(NaiveDateTime),
}

impl TimerSchedule {
    /// Luup timer type code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Interval { .. } => 1,
            Self::DaysOfWeek { .. } => 2,
            Self::DaysOfMonth { .. } => 3,
            Self::Absolute(_) => 4,
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Interval { every: 0, .. } => Err("interval must be positive".into()),
            Self::DaysOfWeek { days, .. } if days.is_empty() => {
                Err("weekly timer needs at least one day".into())
            }
            Self::DaysOfMonth { days, .. } if days.is_empty() => {
                Err("monthly timer needs at least one day".into())
            }
            Self::DaysOfMonth { days, .. } if days.iter().any(|d| !(1..=31).contains(d)) => {
                Err("days of the month must be within 1..=31".into())
            }
            _ => Ok(()),
        }
    }
}

/// A scene timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub id: u32,
    pub name: String,
    pub enabled: bool,
    pub schedule: TimerSchedule,
}

#[derive(Serialize)]
struct TimerWire<'a> {
    id: u32,
    name: &'a str,
    enabled: &'static str,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_of_week: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    days_of_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    day: Option<String>,
}

impl Serialize for Timer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire = TimerWire {
            id: self.id,
            name: &self.name,
            enabled: if self.enabled { "1" } else { "0" },
            kind: self.schedule.code(),
            interval: None,
            days_of_week: None,
            days_of_month: None,
            time: None,
            day: None,
        };
        match &self.schedule {
            TimerSchedule::Interval { every, unit } => {
                let unit = match unit {
                    IntervalUnit::Minutes => 'm',
                    IntervalUnit::Hours => 'h',
                };
                wire.interval = Some(format!("{every}{unit}"));
            }
            TimerSchedule::DaysOfWeek { days, time } => {
                wire.days_of_week = Some(join(days.iter().map(Weekday::number_from_monday)));
                wire.time = Some(time.luup());
            }
            TimerSchedule::DaysOfMonth { days, time } => {
                wire.days_of_month = Some(join(days.iter()));
                wire.time = Some(time.luup());
            }
            TimerSchedule::Absolute(at) => {
                wire.time = Some(hms(at.hour(), at.minute(), at.second()));
                wire.day = Some(format!("{}/{}/{}", at.day(), at.month(), at.year()));
            }
        }
        wire.serialize(serializer)
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items
        .map(|item| ToString::to_string(&item))
        .collect::<Vec<_>>()
        .join(",")
}

// ── Triggers ───────────────────────────────────────────────────────

/// A device event that runs the scene.
///
/// `template` is the event id from the device's `eventList2` in
/// `data_request?id=static`; `arguments` maps that event's argument ids
/// to their values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub name: String,
    pub enabled: bool,
    pub device: u32,
    pub template: u32,
    pub arguments: BTreeMap<u32, String>,
}

#[derive(Serialize)]
struct TriggerArgument<'a> {
    id: String,
    value: &'a str,
}

impl Serialize for Trigger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            name: &'a str,
            enabled: u8,
            template: u32,
            device: u32,
            arguments: Vec<TriggerArgument<'a>>,
        }
        Wire {
            name: &self.name,
            enabled: u8::from(self.enabled),
            template: self.template,
            device: self.device,
            arguments: self
                .arguments
                .iter()
                .map(|(id, value)| TriggerArgument {
                    id: id.to_string(),
                    value,
                })
                .collect(),
        }
        .serialize(serializer)
    }
}

// ── Device commands ────────────────────────────────────────────────

/// A UPnP action sent to one device, as listed under a control state
/// in the device's static data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceCommand {
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Parameters", default, deserialize_with = "parameters")]
    pub parameters: BTreeMap<String, String>,
}

impl DeviceCommand {
    pub fn new(service: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

/// Static data lists parameters as `[{"Name": .., "Value": ..}]`.
fn parameters<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Parameter {
        #[serde(rename = "Name")]
        name: String,
        #[serde(rename = "Value")]
        value: serde_json::Value,
    }
    let list = Vec::<Parameter>::deserialize(deserializer)?;
    Ok(list
        .into_iter()
        .map(|p| {
            let value = match p.value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (p.name, value)
        })
        .collect())
}

/// One state of a device control (e.g. "On" of a toggle button).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceControlState {
    #[serde(rename = "Label", default)]
    pub label: String,
    #[serde(rename = "ControlCode", default)]
    pub control_code: String,
    #[serde(rename = "Command")]
    pub command: DeviceCommand,
}

/// A control from a device's static data, with its selectable states.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceControl {
    #[serde(rename = "ControlType")]
    pub control_type: String,
    #[serde(default)]
    pub states: Vec<DeviceControlState>,
}

impl DeviceControl {
    /// State by control code, e.g. `"power_on"`.
    pub fn state(&self, control_code: &str) -> Option<&DeviceControlState> {
        self.states.iter().find(|s| s.control_code == control_code)
    }
}

// ── Scene request ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct SceneAction {
    device: u32,
    command: DeviceCommand,
}

impl Serialize for SceneAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Argument<'a> {
            name: &'a str,
            value: &'a str,
        }
        #[derive(Serialize)]
        struct Wire<'a> {
            device: String,
            service: &'a str,
            action: &'a str,
            arguments: Vec<Argument<'a>>,
        }
        Wire {
            device: self.device.to_string(),
            service: &self.command.service,
            action: &self.command.action,
            arguments: self
                .command
                .parameters
                .iter()
                .map(|(name, value)| Argument { name, value })
                .collect(),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ActionGroup {
    delay: u64,
    actions: Vec<SceneAction>,
}

/// A validated scene definition, ready for [`Controller::create_scene`].
///
/// [`Controller::create_scene`]: crate::Controller::create_scene
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneRequest {
    name: String,
    room: u32,
    triggers: Vec<Trigger>,
    timers: Vec<Timer>,
    groups: Vec<ActionGroup>,
}

impl SceneRequest {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room(&self) -> u32 {
        self.room
    }

    /// The `json` parameter sent to the hub.
    pub fn to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self).map_err(|e| CoreError::ValidationFailed {
            message: format!("scene cannot be encoded: {e}"),
        })
    }
}

/// Assembles a [`SceneRequest`].
///
/// Actions are grouped by delay; actions sharing a delay run together.
#[derive(Debug, Clone, Default)]
pub struct SceneBuilder {
    name: String,
    room: Option<u32>,
    triggers: Vec<Trigger>,
    timers: Vec<Timer>,
    groups: BTreeMap<u64, Vec<SceneAction>>,
}

impl SceneBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_room(mut self, room_id: u32) -> Self {
        self.room = Some(room_id);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_timer(mut self, timer: Timer) -> Self {
        self.timers.push(timer);
        self
    }

    /// Run `command` on `device` once `delay` (whole seconds) has passed.
    pub fn with_action(mut self, delay: Duration, device: u32, command: DeviceCommand) -> Self {
        self.groups
            .entry(delay.as_secs())
            .or_default()
            .push(SceneAction { device, command });
        self
    }

    /// Shorthand for the command behind a control state.
    pub fn with_control_state(
        self,
        delay: Duration,
        device: u32,
        state: &DeviceControlState,
    ) -> Self {
        self.with_action(delay, device, state.command.clone())
    }

    pub fn build(self) -> Result<SceneRequest, CoreError> {
        let invalid = |message: String| CoreError::ValidationFailed { message };

        let name = self.name.trim();
        if name.is_empty() {
            return Err(invalid("scene name must not be empty".into()));
        }
        let Some(room) = self.room else {
            return Err(invalid(format!("scene '{name}' needs a room")));
        };
        for timer in &self.timers {
            timer
                .schedule
                .validate()
                .map_err(|reason| invalid(format!("timer '{}': {reason}", timer.name)))?;
        }

        Ok(SceneRequest {
            name: name.to_owned(),
            room,
            triggers: self.triggers,
            timers: self.timers,
            groups: self
                .groups
                .into_iter()
                .map(|(delay, actions)| ActionGroup { delay, actions })
                .collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SWITCH: &str = "urn:upnp-org:serviceId:SwitchPower1";

    fn at(h: u32, m: u32) -> TimeOfDay {
        TimeOfDay::At(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    #[test]
    fn timers_use_luup_notation() {
        let weekly = Timer {
            id: 1,
            name: "Weekdays".into(),
            enabled: true,
            schedule: TimerSchedule::DaysOfWeek {
                days: vec![Weekday::Mon, Weekday::Fri],
                time: at(7, 30),
            },
        };
        assert_eq!(
            serde_json::to_value(&weekly).unwrap(),
            json!({ "id": 1, "name": "Weekdays", "enabled": "1", "type": 2,
                    "days_of_week": "1,5", "time": "7:30:0" })
        );

        let dusk = Timer {
            id: 2,
            name: "Dusk".into(),
            enabled: false,
            schedule: TimerSchedule::DaysOfMonth {
                days: vec![1, 15],
                time: TimeOfDay::Solar {
                    event: SolarEvent::Sunset,
                    after: false,
                    offset: Duration::from_secs(30 * 60),
                },
            },
        };
        assert_eq!(
            serde_json::to_value(&dusk).unwrap(),
            json!({ "id": 2, "name": "Dusk", "enabled": "0", "type": 3,
                    "days_of_month": "1,15", "time": "-0:30:0T" })
        );

        let once = Timer {
            id: 3,
            name: "Once".into(),
            enabled: true,
            schedule: TimerSchedule::Absolute(
                NaiveDate::from_ymd_opt(2026, 3, 9)
                    .unwrap()
                    .and_hms_opt(18, 5, 0)
                    .unwrap(),
            ),
        };
        let value = serde_json::to_value(&once).unwrap();
        assert_eq!(value["type"], 4);
        assert_eq!(value["time"], "18:5:0");
        assert_eq!(value["day"], "9/3/2026");

        let every = Timer {
            id: 4,
            name: "Poll".into(),
            enabled: true,
            schedule: TimerSchedule::Interval {
                every: 15,
                unit: IntervalUnit::Minutes,
            },
        };
        assert_eq!(serde_json::to_value(&every).unwrap()["interval"], "15m");
    }

    #[test]
    fn actions_are_grouped_by_delay() {
        let on = DeviceCommand::new(SWITCH, "SetTarget").with_parameter("newTargetValue", "1");
        let off = DeviceCommand::new(SWITCH, "SetTarget").with_parameter("newTargetValue", "0");
        let request = SceneBuilder::new("  Evening ")
            .in_room(4)
            .with_action(Duration::from_secs(60), 12, off)
            .with_action(Duration::ZERO, 10, on.clone())
            .with_action(Duration::ZERO, 11, on)
            .with_trigger(Trigger {
                name: "Door opens".into(),
                enabled: true,
                device: 20,
                template: 1,
                arguments: BTreeMap::from([(1, "1".to_owned())]),
            })
            .build()
            .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["name"], "Evening");
        assert_eq!(value["room"], 4);
        assert_eq!(value["groups"][0]["delay"], 0);
        assert_eq!(value["groups"][0]["actions"].as_array().unwrap().len(), 2);
        assert_eq!(
            value["groups"][1],
            json!({ "delay": 60, "actions": [{
                "device": "12", "service": SWITCH, "action": "SetTarget",
                "arguments": [{ "name": "newTargetValue", "value": "0" }]
            }] })
        );
        assert_eq!(
            value["triggers"][0],
            json!({ "name": "Door opens", "enabled": 1, "template": 1, "device": 20,
                    "arguments": [{ "id": "1", "value": "1" }] })
        );
    }

    #[test]
    fn build_rejects_incomplete_scenes() {
        assert!(matches!(
            SceneBuilder::new("").in_room(1).build(),
            Err(CoreError::ValidationFailed { .. })
        ));
        assert!(matches!(
            SceneBuilder::new("No room").build(),
            Err(CoreError::ValidationFailed { .. })
        ));
        let bad_timer = Timer {
            id: 1,
            name: "Never".into(),
            enabled: true,
            schedule: TimerSchedule::DaysOfMonth {
                days: vec![32],
                time: at(8, 0),
            },
        };
        let err = SceneBuilder::new("Broken")
            .in_room(1)
            .with_timer(bad_timer)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Never"));
    }

    #[test]
    fn control_states_come_from_static_data() {
        let control: DeviceControl = serde_json::from_value(json!({
            "ControlType": "multi_state_button",
            "states": [
                { "Label": "On", "ControlCode": "power_on",
                  "Command": { "Service": SWITCH, "Action": "SetTarget",
                               "Parameters": [{ "Name": "newTargetValue", "Value": "1" }] } },
                { "Label": "Off", "ControlCode": "power_off",
                  "Command": { "Service": SWITCH, "Action": "SetTarget",
                               "Parameters": [{ "Name": "newTargetValue", "Value": 0 }] } }
            ]
        }))
        .unwrap();

        let off = control.state("power_off").unwrap();
        assert_eq!(off.command.parameters["newTargetValue"], "0");
        assert!(control.state("dim").is_none());

        let request = SceneBuilder::new("All off")
            .in_room(1)
            .with_control_state(Duration::ZERO, 10, off)
            .build()
            .unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["groups"][0]["actions"][0]["action"], "SetTarget");
    }
}
