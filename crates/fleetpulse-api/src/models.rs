//! Serde models for the FleetPulse wire contract.
//!
//! The backend follows the bearer-token/email-keyed contract: employees are
//! identified by email, vehicles by their numeric id or sensor IMEI. The
//! `/vehicles` listing returns minimal records (vin + imei); the admin
//! listing returns full records, hence the optional fields on [`Vehicle`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

/// Where a successful login lands: flat two-role routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    UserDashboard,
    AdminDashboard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Employee {
    pub fn landing(&self) -> Landing {
        match self.role {
            Role::Admin => Landing::AdminDashboard,
            Role::User => Landing::UserDashboard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Payload of a successful login or registration envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub access_token: String,
    pub employee: Employee,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default)]
    pub id: Option<i64>,
    pub sensor_imei: String,
    pub vehicle_vin: String,
    #[serde(default)]
    pub vehicle_brand: Option<String>,
    #[serde(default)]
    pub vehicle_model: Option<String>,
    #[serde(default)]
    pub vehicle_year: Option<i32>,
    #[serde(default)]
    pub vehicle_color: Option<String>,
    #[serde(default)]
    pub vehicle_plate_number: Option<String>,
    #[serde(default)]
    pub vehicle_fuel_type: Option<String>,
    #[serde(default)]
    pub vehicle_transmission: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Latest telemetry snapshot for one vehicle, keyed by sensor IMEI.
///
/// Sensor channels come over the wire with dotted keys (`position.latitude`,
/// `can.fuel.level`); everything is optional because a sensor only reports
/// the channels it has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    #[serde(default)]
    pub sensor_imei: Option<String>,
    #[serde(rename = "position.latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "position.longitude", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "position.speed", default)]
    pub speed: Option<f64>,
    #[serde(rename = "can.fuel.level", default)]
    pub fuel_level: Option<f64>,
    #[serde(default)]
    pub engine_load: Option<f64>,
    #[serde(default)]
    pub speeding_status: Option<String>,
    #[serde(default)]
    pub ecu_status: Option<String>,
    #[serde(default)]
    pub engine_stability: Option<String>,
    #[serde(default)]
    pub overheating_risk: Option<String>,
    /// JSON-encoded map of fault code -> description; see [`Self::fault_codes`].
    #[serde(default)]
    pub faults: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl VehicleTelemetry {
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// Active fault codes, decoded from the backend's JSON string.
    /// An absent or malformed field is an empty map.
    pub fn fault_codes(&self) -> BTreeMap<String, String> {
        self.faults
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }

    /// Snapshot time, when the sensor reported one in RFC 3339.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterVehicleRequest {
    pub user_email: String,
    pub sensor_imei: String,
    pub vehicle_vin: String,
    pub vehicle_brand: String,
    pub vehicle_model: String,
    pub vehicle_year: i32,
    pub vehicle_color: String,
    pub vehicle_plate_number: String,
    pub vehicle_fuel_type: String,
    pub vehicle_transmission: String,
}

/// Partial vehicle update; only set fields are serialized.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateVehicleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_plate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_routes_to_its_dashboard() {
        let user: Employee =
            serde_json::from_value(json!({"email": "a@b.com", "role": "user"})).unwrap();
        assert_eq!(user.landing(), Landing::UserDashboard);

        let admin: Employee =
            serde_json::from_value(json!({"email": "ops@b.com", "role": "admin"})).unwrap();
        assert_eq!(admin.landing(), Landing::AdminDashboard);
    }

    #[test]
    fn minimal_vehicle_record_deserializes() {
        let vehicle: Vehicle = serde_json::from_value(json!({
            "sensor_imei": "860000000000001",
            "vehicle_vin": "1HGBH41JXMN109186",
        }))
        .unwrap();
        assert_eq!(vehicle.sensor_imei, "860000000000001");
        assert!(vehicle.vehicle_brand.is_none());
    }

    #[test]
    fn telemetry_dotted_keys_and_faults() {
        let data: VehicleTelemetry = serde_json::from_value(json!({
            "sensor_imei": "860000000000001",
            "position.latitude": 6.5244,
            "position.longitude": 3.3792,
            "can.fuel.level": 62.0,
            "speeding_status": "BELOW LIMIT",
            "faults": "{\"P0301\":\"Cylinder 1 misfire detected\"}",
            "timestamp": "2025-11-02T09:30:00Z",
        }))
        .unwrap();
        assert!(data.has_position());
        assert_eq!(data.fuel_level, Some(62.0));
        assert_eq!(
            data.fault_codes().get("P0301").map(String::as_str),
            Some("Cylinder 1 misfire detected")
        );
        assert!(data.recorded_at().is_some());
    }

    #[test]
    fn malformed_faults_are_an_empty_map() {
        let data: VehicleTelemetry =
            serde_json::from_value(json!({"faults": "not json"})).unwrap();
        assert!(data.fault_codes().is_empty());
    }

    #[test]
    fn partial_update_serializes_only_set_fields() {
        let patch = UpdateVehicleRequest {
            vehicle_is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"vehicle_is_active": false})
        );
    }
}
