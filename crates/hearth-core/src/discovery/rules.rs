// ── Category rule tables ──
//
// Declarative sensor rules per appliance family. A rule fires only when
// its key is present in the reported state and holds a scalar value.

use super::document::SensorSpec;
use crate::model::DeviceCategory;

/// How a rule's value is rendered in the hub template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueTransform {
    /// Expose the reported value as-is.
    Raw,
    /// Reported in seconds, exposed in whole minutes.
    SecondsToMinutes,
}

/// One category-specific sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorRule {
    pub key: &'static str,
    pub name: &'static str,
    pub transform: ValueTransform,
    pub spec: SensorSpec,
}

impl SensorRule {
    const fn raw(key: &'static str, name: &'static str, spec: SensorSpec) -> Self {
        Self {
            key,
            name,
            transform: ValueTransform::Raw,
            spec,
        }
    }

    const fn seconds_as_minutes(key: &'static str, name: &'static str, spec: SensorSpec) -> Self {
        Self {
            key,
            name,
            transform: ValueTransform::SecondsToMinutes,
            spec,
        }
    }
}

const TEMPERATURE: SensorSpec = SensorSpec::plain()
    .unit("°C")
    .device_class("temperature")
    .measurement();

const REFRIGERATION_RULES: &[SensorRule] = &[
    SensorRule::raw("temperature", "Temperature", TEMPERATURE),
    SensorRule::raw(
        "targetTemperature",
        "Target temperature",
        SensorSpec::plain().unit("°C").device_class("temperature"),
    ),
    SensorRule::raw("freezerTemperature", "Freezer temperature", TEMPERATURE),
    SensorRule::raw(
        "humidity",
        "Humidity",
        SensorSpec::plain()
            .unit("%")
            .device_class("humidity")
            .measurement(),
    ),
    SensorRule::raw("doorState", "Door", SensorSpec::plain().icon("mdi:door")),
];

const PROGRAM: SensorRule = SensorRule::raw("programName", "Program", SensorSpec::plain().icon("mdi:tune"));

const CYCLE_PHASE: SensorRule = SensorRule::raw(
    "cyclePhase",
    "Cycle phase",
    SensorSpec::plain().icon("mdi:state-machine"),
);

const REMAINING: SensorSpec = SensorSpec::plain()
    .unit("min")
    .device_class("duration")
    .icon("mdi:timer-outline");

const LAUNDRY_RULES: &[SensorRule] = &[
    PROGRAM,
    CYCLE_PHASE,
    SensorRule::seconds_as_minutes("timeToEnd", "Time remaining", REMAINING),
];

const DISHWASHER_RULES: &[SensorRule] = &[
    PROGRAM,
    CYCLE_PHASE,
    SensorRule::raw("timeToEnd", "Time remaining", REMAINING),
];

/// Rule table for a category, in emission order.
pub fn rules_for(category: DeviceCategory) -> &'static [SensorRule] {
    match category {
        DeviceCategory::Refrigeration => REFRIGERATION_RULES,
        DeviceCategory::Washer | DeviceCategory::Dryer | DeviceCategory::WasherDryer => {
            LAUNDRY_RULES
        }
        DeviceCategory::Dishwasher => DISHWASHER_RULES,
        DeviceCategory::Other => &[],
    }
}
