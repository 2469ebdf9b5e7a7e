//! Route contract table.
//!
//! Single source of truth for every network operation's shape: HTTP method,
//! URL template, whether a bearer token is required, the input schema and the
//! response shape expected per status code. Descriptors are static data shared
//! verbatim by every caller; the request executor in `fleetpulse-client` is
//! their only consumer.
//!
//! Operations are an enum rather than a string-keyed map, so referring to an
//! unregistered operation is a compile error, not a runtime condition.

use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::schema::{FieldKind, FieldRule, InputSchema, ResponseShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path parameters for URL templating.
///
/// Ordered map so the serialized form is canonical, which the query cache
/// relies on for key identity.
pub type Params = BTreeMap<String, String>;

/// One logical backend operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Login,
    Register,
    CurrentUser,
    Logout,
    VehicleList,
    VehicleData,
    VehicleSync,
    AdminUserGet,
    AdminUserVehicles,
    AdminResetPassword,
    AdminRegisterVehicle,
    AdminUpdateVehicle,
}

/// Static definition of one endpoint's shape.
#[derive(Debug, Clone, Copy)]
pub struct RouteDescriptor {
    pub method: Method,
    /// Path template; `:name` segments are substituted via [`build_url`].
    pub path: &'static str,
    pub requires_auth: bool,
    pub admin_only: bool,
    pub input: Option<InputSchema>,
    /// Response shape per expected status code.
    pub responses: &'static [(u16, ResponseShape)],
}

impl RouteDescriptor {
    pub fn response_shape(&self, status: u16) -> Option<ResponseShape> {
        self.responses
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, shape)| *shape)
    }
}

const ENVELOPE_200: &[(u16, ResponseShape)] = &[(200, ResponseShape::Envelope)];

const LOGIN: RouteDescriptor = RouteDescriptor {
    method: Method::Post,
    path: "/login",
    requires_auth: false,
    admin_only: false,
    input: Some(InputSchema {
        fields: &[
            FieldRule {
                name: "email",
                kind: FieldKind::Email,
                required: true,
            },
            FieldRule {
                name: "password",
                kind: FieldKind::String,
                required: true,
            },
        ],
    }),
    responses: &[
        (200, ResponseShape::Envelope),
        (401, ResponseShape::Message),
    ],
};

const REGISTER: RouteDescriptor = RouteDescriptor {
    method: Method::Post,
    path: "/register",
    requires_auth: false,
    admin_only: false,
    input: Some(InputSchema {
        fields: &[
            FieldRule {
                name: "email",
                kind: FieldKind::Email,
                required: true,
            },
            FieldRule {
                name: "password",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "full_name",
                kind: FieldKind::String,
                required: true,
            },
        ],
    }),
    responses: &[
        (200, ResponseShape::Envelope),
        (400, ResponseShape::Message),
    ],
};

const CURRENT_USER: RouteDescriptor = RouteDescriptor {
    method: Method::Get,
    path: "/me",
    requires_auth: true,
    admin_only: false,
    input: None,
    responses: &[
        (200, ResponseShape::Envelope),
        (401, ResponseShape::Message),
    ],
};

const LOGOUT: RouteDescriptor = RouteDescriptor {
    method: Method::Post,
    path: "/logout",
    requires_auth: true,
    admin_only: false,
    input: None,
    responses: ENVELOPE_200,
};

const VEHICLE_LIST: RouteDescriptor = RouteDescriptor {
    method: Method::Get,
    path: "/vehicles",
    requires_auth: true,
    admin_only: false,
    input: None,
    responses: ENVELOPE_200,
};

const VEHICLE_DATA: RouteDescriptor = RouteDescriptor {
    method: Method::Get,
    path: "/vehicle/:imei/data",
    requires_auth: true,
    admin_only: false,
    input: None,
    responses: &[
        (200, ResponseShape::Envelope),
        (404, ResponseShape::Message),
    ],
};

const VEHICLE_SYNC: RouteDescriptor = RouteDescriptor {
    method: Method::Post,
    path: "/sync",
    requires_auth: true,
    admin_only: false,
    input: None,
    responses: ENVELOPE_200,
};

const ADMIN_USER_GET: RouteDescriptor = RouteDescriptor {
    method: Method::Get,
    path: "/admin/user/:email",
    requires_auth: true,
    admin_only: true,
    input: None,
    responses: &[
        (200, ResponseShape::Envelope),
        (404, ResponseShape::Message),
    ],
};

const ADMIN_USER_VEHICLES: RouteDescriptor = RouteDescriptor {
    method: Method::Get,
    path: "/admin/user/:email/vehicles",
    requires_auth: true,
    admin_only: true,
    input: None,
    responses: ENVELOPE_200,
};

const ADMIN_RESET_PASSWORD: RouteDescriptor = RouteDescriptor {
    method: Method::Post,
    path: "/admin/reset-password",
    requires_auth: true,
    admin_only: true,
    input: Some(InputSchema {
        fields: &[
            FieldRule {
                name: "email",
                kind: FieldKind::Email,
                required: true,
            },
            FieldRule {
                name: "new_password",
                kind: FieldKind::String,
                required: true,
            },
        ],
    }),
    responses: ENVELOPE_200,
};

const ADMIN_REGISTER_VEHICLE: RouteDescriptor = RouteDescriptor {
    method: Method::Post,
    path: "/admin/register-vehicle",
    requires_auth: true,
    admin_only: true,
    input: Some(InputSchema {
        fields: &[
            FieldRule {
                name: "user_email",
                kind: FieldKind::Email,
                required: true,
            },
            FieldRule {
                name: "sensor_imei",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "vehicle_vin",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "vehicle_brand",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "vehicle_model",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "vehicle_year",
                kind: FieldKind::Integer,
                required: true,
            },
            FieldRule {
                name: "vehicle_color",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "vehicle_plate_number",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "vehicle_fuel_type",
                kind: FieldKind::String,
                required: true,
            },
            FieldRule {
                name: "vehicle_transmission",
                kind: FieldKind::String,
                required: true,
            },
        ],
    }),
    responses: ENVELOPE_200,
};

const ADMIN_UPDATE_VEHICLE: RouteDescriptor = RouteDescriptor {
    method: Method::Put,
    path: "/admin/vehicle/:vehicle_id",
    requires_auth: true,
    admin_only: true,
    input: Some(InputSchema {
        // Partial update: everything optional, unknown keys ignored.
        fields: &[
            FieldRule {
                name: "vehicle_brand",
                kind: FieldKind::String,
                required: false,
            },
            FieldRule {
                name: "vehicle_model",
                kind: FieldKind::String,
                required: false,
            },
            FieldRule {
                name: "vehicle_year",
                kind: FieldKind::Integer,
                required: false,
            },
            FieldRule {
                name: "vehicle_color",
                kind: FieldKind::String,
                required: false,
            },
            FieldRule {
                name: "vehicle_plate_number",
                kind: FieldKind::String,
                required: false,
            },
            FieldRule {
                name: "vehicle_fuel_type",
                kind: FieldKind::String,
                required: false,
            },
            FieldRule {
                name: "vehicle_transmission",
                kind: FieldKind::String,
                required: false,
            },
            FieldRule {
                name: "vehicle_is_active",
                kind: FieldKind::Boolean,
                required: false,
            },
        ],
    }),
    responses: ENVELOPE_200,
};

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::Login,
        Operation::Register,
        Operation::CurrentUser,
        Operation::Logout,
        Operation::VehicleList,
        Operation::VehicleData,
        Operation::VehicleSync,
        Operation::AdminUserGet,
        Operation::AdminUserVehicles,
        Operation::AdminResetPassword,
        Operation::AdminRegisterVehicle,
        Operation::AdminUpdateVehicle,
    ];

    /// Dotted logical name, used for cache keys and log output.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Login => "auth.login",
            Operation::Register => "auth.register",
            Operation::CurrentUser => "auth.me",
            Operation::Logout => "auth.logout",
            Operation::VehicleList => "vehicles.list",
            Operation::VehicleData => "vehicles.data",
            Operation::VehicleSync => "vehicles.sync",
            Operation::AdminUserGet => "admin.user.get",
            Operation::AdminUserVehicles => "admin.user.vehicles",
            Operation::AdminResetPassword => "admin.reset_password",
            Operation::AdminRegisterVehicle => "admin.register_vehicle",
            Operation::AdminUpdateVehicle => "admin.update_vehicle",
        }
    }

    pub fn descriptor(&self) -> &'static RouteDescriptor {
        match self {
            Operation::Login => &LOGIN,
            Operation::Register => &REGISTER,
            Operation::CurrentUser => &CURRENT_USER,
            Operation::Logout => &LOGOUT,
            Operation::VehicleList => &VEHICLE_LIST,
            Operation::VehicleData => &VEHICLE_DATA,
            Operation::VehicleSync => &VEHICLE_SYNC,
            Operation::AdminUserGet => &ADMIN_USER_GET,
            Operation::AdminUserVehicles => &ADMIN_USER_VEHICLES,
            Operation::AdminResetPassword => &ADMIN_RESET_PASSWORD,
            Operation::AdminRegisterVehicle => &ADMIN_REGISTER_VEHICLE,
            Operation::AdminUpdateVehicle => &ADMIN_UPDATE_VEHICLE,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Substitute every `:name` placeholder in `template` with `params[name]`.
///
/// A placeholder without a substitution is `MissingParameter`; unresolved
/// placeholders must never reach the network layer. Params not referenced by
/// the template are ignored, so similar endpoints can share a param object.
pub fn build_url(template: &str, params: &Params) -> Result<String, ApiError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(idx) = rest.find(':') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..end];
        if name.is_empty() {
            // A bare ':' (e.g. inside a scheme) is literal text.
            out.push(':');
            rest = after;
            continue;
        }
        match params.get(name) {
            Some(value) => out.push_str(value),
            None => {
                return Err(ApiError::MissingParameter {
                    name: name.to_string(),
                })
            }
        }
        rest = &after[end..];
    }

    out.push_str(rest);
    Ok(out)
}
