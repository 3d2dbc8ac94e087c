use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single cell value as the server sends it. Every wire field is optional
/// and loosely typed, so rows carry `Option<Scalar>` and render absent
/// values as empty text.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Scalar {
    pub fn from_value(value: &Value) -> Option<Scalar> {
        match value {
            Value::Null | Value::Array(_) | Value::Object(_) => None,
            Value::Bool(flag) => Some(Scalar::Bool(*flag)),
            Value::Number(number) => match number.as_i64() {
                Some(int) => Some(Scalar::Integer(int)),
                None => number.as_f64().map(Scalar::Float),
            },
            Value::String(text) => Some(Scalar::Text(text.clone())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(value) => Some(*value as f64),
            Scalar::Float(value) => Some(*value),
            Scalar::Bool(_) | Scalar::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn checked_add(&self, other: &Scalar) -> Option<Scalar> {
        match (self, other) {
            (Scalar::Integer(a), Scalar::Integer(b)) => a.checked_add(*b).map(Scalar::Integer),
            _ => Some(Scalar::Float(self.as_f64()? + other.as_f64()?)),
        }
    }

    pub fn checked_sub(&self, other: &Scalar) -> Option<Scalar> {
        match (self, other) {
            (Scalar::Integer(a), Scalar::Integer(b)) => a.checked_sub(*b).map(Scalar::Integer),
            _ => Some(Scalar::Float(self.as_f64()? - other.as_f64()?)),
        }
    }
}

impl fmt::Display for Scalar {
    // Integral floats print without a fraction, matching how the values read
    // in the web UI (`5.0` shows as `5`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(value) => write!(f, "{}", value),
            Scalar::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{:.0}", value)
            }
            Scalar::Float(value) => write!(f, "{}", value),
            Scalar::Bool(value) => write!(f, "{}", value),
            Scalar::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

/// Text for an optional cell; absent fields render empty.
pub fn cell_text(value: &Option<Scalar>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ServiceDefinition {
    #[serde(default)]
    pub code: Option<Scalar>,
    #[serde(default)]
    pub title: Option<Scalar>,
    #[serde(default)]
    pub duration: Option<Scalar>,
}

/// Reply of `/add_service`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ServiceAdded {
    #[serde(default)]
    pub service_code: Option<Scalar>,
    #[serde(default)]
    pub service_title: Option<Scalar>,
    #[serde(default)]
    pub service_duration: Option<Scalar>,
}

impl From<ServiceAdded> for ServiceDefinition {
    fn from(value: ServiceAdded) -> Self {
        ServiceDefinition {
            code: value.service_code,
            title: value.service_title,
            duration: value.service_duration,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ArrivalDistributionRow {
    #[serde(rename = "Time Between Arrival", default)]
    pub time_between_arrival: Option<Scalar>,
    #[serde(rename = "Probability", default)]
    pub probability: Option<Scalar>,
    #[serde(rename = "Accumulative Probability", default)]
    pub cumulative_probability: Option<Scalar>,
    #[serde(rename = "Digit Assignment From", default)]
    pub digit_from: Option<Scalar>,
    #[serde(rename = "Digit Assignment To", default)]
    pub digit_to: Option<Scalar>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerDistributionRow {
    #[serde(rename = "Server No.", default)]
    pub server_no: Option<Scalar>,
    #[serde(rename = "Service Time", default)]
    pub service_time: Option<Scalar>,
    #[serde(rename = "Server Probability", default)]
    pub probability: Option<Scalar>,
    #[serde(rename = "Server Accumulative Probability", default)]
    pub cumulative_probability: Option<Scalar>,
    #[serde(rename = "Server Digit Assignment From", default)]
    pub digit_from: Option<Scalar>,
    #[serde(rename = "Server Digit Assignment To", default)]
    pub digit_to: Option<Scalar>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SimulationEvent {
    #[serde(rename = "Customer ID", default)]
    pub customer_id: Option<Scalar>,
    #[serde(rename = "Event Type", default)]
    pub event_type: Option<Scalar>,
    #[serde(rename = "Interval Time", default)]
    pub interval_time: Option<Scalar>,
    #[serde(rename = "Clock Time", default)]
    pub clock_time: Option<Scalar>,
    #[serde(rename = "Service Code", default)]
    pub service_code: Option<Scalar>,
    #[serde(rename = "Service Title", default)]
    pub service_title: Option<Scalar>,
    #[serde(rename = "Service Duration", default)]
    pub service_duration: Option<Scalar>,
    #[serde(rename = "Start Time", default)]
    pub start_time: Option<Scalar>,
    #[serde(rename = "End Time", default)]
    pub end_time: Option<Scalar>,
    #[serde(rename = "Waiting Time", default)]
    pub waiting_time: Option<Scalar>,
    #[serde(
        rename = "Arrival Probability",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub arrival_probability: Option<Scalar>,
    #[serde(
        rename = "Completion Probability",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_probability: Option<Scalar>,
}

impl SimulationEvent {
    pub fn is_arrival(&self) -> bool {
        self.event_type
            .as_ref()
            .and_then(Scalar::as_text)
            .map(|kind| kind == "Arrival")
            .unwrap_or(false)
    }
}

/// One customer of the parallel-server model.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerAssignmentEvent {
    #[serde(rename = "Customer ID", default)]
    pub customer_id: Option<Scalar>,
    #[serde(rename = "Server", default)]
    pub server: Option<Scalar>,
    #[serde(rename = "Clock Time", default)]
    pub clock_time: Option<Scalar>,
    #[serde(rename = "Wait Time", default)]
    pub wait_time: Option<Scalar>,
    #[serde(rename = "Service Duration", default)]
    pub service_duration: Option<Scalar>,
    #[serde(rename = "End Time", default)]
    pub end_time: Option<Scalar>,
}

impl ServerAssignmentEvent {
    pub fn service_start(&self) -> Option<Scalar> {
        self.clock_time.as_ref()?.checked_add(self.wait_time.as_ref()?)
    }

    pub fn time_in_system(&self) -> Option<Scalar> {
        self.end_time.as_ref()?.checked_sub(self.clock_time.as_ref()?)
    }
}

const UTILIZATION_SUFFIX: &str = " Utilization Rate";

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Metrics {
    #[serde(rename = "Total Customers", default)]
    pub total_customers: Option<Scalar>,
    #[serde(rename = "Average Waiting Time", default)]
    pub average_waiting_time: Option<Scalar>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Metrics {
    /// Per-server utilization, keyed by server name (`"Able Utilization Rate"`
    /// becomes `"Able"`).
    pub fn utilization(&self) -> Vec<(String, Scalar)> {
        self.extra
            .iter()
            .filter_map(|(key, value)| {
                let server = key.strip_suffix(UTILIZATION_SUFFIX)?;
                Some((server.to_string(), Scalar::from_value(value)?))
            })
            .collect()
    }
}

/// How a decoded reply body reports its own outcome.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyStatus {
    Ok,
    /// `success` was present and falsy; `message` is shown verbatim, `error`
    /// is prefixed with the action label.
    Failed {
        message: Option<String>,
        error: Option<String>,
    },
}

pub fn reply_status(body: &Value) -> ReplyStatus {
    match body.get("success") {
        Some(flag) if is_falsy(flag) => ReplyStatus::Failed {
            message: body.get("message").and_then(text_of),
            error: body.get("error").and_then(text_of),
        },
        _ => ReplyStatus::Ok,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().map(|n| n == 0.0).unwrap_or(false),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_prints_integral_floats_without_fraction() {
        assert_eq!(Scalar::Float(5.0).to_string(), "5");
        assert_eq!(Scalar::Float(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Integer(-3).to_string(), "-3");
        assert_eq!(Scalar::Text("Basic".into()).to_string(), "Basic");
    }

    #[test]
    fn simulation_event_reads_wire_names_and_treats_null_as_absent() {
        let event: SimulationEvent = serde_json::from_value(json!({
            "Customer ID": 1,
            "Event Type": "Arrival",
            "Clock Time": 0,
            "Service Code": "A",
            "Service Title": "Basic",
            "Service Duration": 5,
            "End Time": 5,
            "Arrival Probability": null
        }))
        .unwrap();
        assert_eq!(event.customer_id, Some(Scalar::Integer(1)));
        assert!(event.is_arrival());
        assert_eq!(event.arrival_probability, None);
        assert_eq!(event.start_time, None);
        assert_eq!(cell_text(&event.start_time), "");
    }

    #[test]
    fn server_assignment_derives_start_and_time_in_system() {
        let event: ServerAssignmentEvent = serde_json::from_value(json!({
            "Customer ID": 2,
            "Server": "Able",
            "Clock Time": 3.5,
            "Wait Time": 1.5,
            "Service Duration": 4,
            "End Time": 9
        }))
        .unwrap();
        assert_eq!(event.service_start().unwrap().to_string(), "5");
        assert_eq!(event.time_in_system().unwrap().to_string(), "5.5");

        let partial = ServerAssignmentEvent {
            clock_time: Some(Scalar::Integer(1)),
            ..ServerAssignmentEvent::default()
        };
        assert_eq!(partial.service_start(), None);
    }

    #[test]
    fn metrics_collects_every_server_utilization() {
        let metrics: Metrics = serde_json::from_value(json!({
            "Total Customers": 12,
            "Average Waiting Time": "1.25 minutes",
            "Able Utilization Rate": "80.00%",
            "Baker Utilization Rate": "61.67%"
        }))
        .unwrap();
        assert_eq!(metrics.total_customers, Some(Scalar::Integer(12)));
        assert_eq!(
            metrics.utilization(),
            vec![
                ("Able".to_string(), Scalar::from("80.00%")),
                ("Baker".to_string(), Scalar::from("61.67%")),
            ]
        );
    }

    #[test]
    fn reply_status_only_fails_on_present_falsy_success() {
        assert_eq!(reply_status(&json!({"data": []})), ReplyStatus::Ok);
        assert_eq!(reply_status(&json!({"success": true})), ReplyStatus::Ok);
        assert_eq!(
            reply_status(&json!({"success": false, "message": "No data available to download"})),
            ReplyStatus::Failed {
                message: Some("No data available to download".to_string()),
                error: None,
            }
        );
        assert_eq!(
            reply_status(&json!({"success": 0, "error": "No services available!"})),
            ReplyStatus::Failed {
                message: None,
                error: Some("No services available!".to_string()),
            }
        );
    }
}
