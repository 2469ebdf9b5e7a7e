//! Structural validation for request bodies and response shapes.
//!
//! Schemas are const data embedded in the route table. Input validation
//! collects every violation instead of stopping at the first, so a form can
//! show all of its problems in one round trip.

use serde_json::Value;

use crate::error::{ApiError, Violation};

/// Input schema for one endpoint: the fields a JSON object body must carry.
///
/// Fields not listed in the schema are ignored; several endpoints share
/// partially overlapping bodies.
#[derive(Debug, Clone, Copy)]
pub struct InputSchema {
    pub fields: &'static [FieldRule],
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Email,
    Integer,
    Boolean,
}

impl FieldKind {
    fn check(&self, value: &Value) -> Result<(), &'static str> {
        match self {
            FieldKind::String => match value.as_str() {
                Some(s) if !s.is_empty() => Ok(()),
                Some(_) => Err("must not be empty"),
                None => Err("must be a string"),
            },
            FieldKind::Email => match value.as_str() {
                Some(s) if is_email(s) => Ok(()),
                Some(_) => Err("must be a valid email address"),
                None => Err("must be a string"),
            },
            FieldKind::Integer => {
                if value.as_i64().is_some() {
                    Ok(())
                } else {
                    Err("must be an integer")
                }
            }
            FieldKind::Boolean => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err("must be a boolean")
                }
            }
        }
    }
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !s.chars().any(char::is_whitespace)
}

impl InputSchema {
    /// Validate `payload` against this schema, reporting every violation.
    pub fn validate(&self, payload: &Value) -> Result<(), ApiError> {
        let Some(object) = payload.as_object() else {
            return Err(ApiError::validation("body", "must be a JSON object"));
        };

        let mut violations = Vec::new();
        for rule in self.fields {
            match object.get(rule.name) {
                None | Some(Value::Null) => {
                    if rule.required {
                        violations.push(Violation {
                            field: rule.name.to_string(),
                            reason: "is required".to_string(),
                        });
                    }
                }
                Some(value) => {
                    if let Err(reason) = rule.kind.check(value) {
                        violations.push(Violation {
                            field: rule.name.to_string(),
                            reason: reason.to_string(),
                        });
                    }
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation { violations })
        }
    }
}

/// Declared shape of a response body for a given status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// The standard `{responseCode, responseMessage, data?}` envelope.
    Envelope,
    /// A bare `{message}` error body.
    Message,
}

impl ResponseShape {
    /// Structural check of a parsed body against this shape.
    pub fn check(&self, body: &Value) -> Result<(), ApiError> {
        let ok = match self {
            ResponseShape::Envelope => {
                body.get("responseCode").map(Value::is_string) == Some(true)
                    && body.get("responseMessage").map(Value::is_string) == Some(true)
            }
            ResponseShape::Message => body.get("message").map(Value::is_string) == Some(true),
        };
        if ok {
            Ok(())
        } else {
            Err(ApiError::unexpected_shape(format!(
                "body does not conform to the declared {:?} shape",
                self
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LOGIN_FIELDS: &[FieldRule] = &[
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
    ];

    #[test]
    fn collects_every_violation() {
        let schema = InputSchema {
            fields: LOGIN_FIELDS,
        };
        let err = schema
            .validate(&json!({"email": "not-an-email"}))
            .unwrap_err();
        let ApiError::Validation { violations } = err else {
            panic!("expected validation error");
        };
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].field, "email");
        assert_eq!(violations[1].field, "password");
        assert_eq!(violations[1].reason, "is required");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let schema = InputSchema {
            fields: LOGIN_FIELDS,
        };
        schema
            .validate(&json!({
                "email": "a@b.com",
                "password": "x",
                "remember_me": true,
            }))
            .unwrap();
    }

    #[test]
    fn null_counts_as_absent() {
        let schema = InputSchema {
            fields: LOGIN_FIELDS,
        };
        let err = schema
            .validate(&json!({"email": "a@b.com", "password": null}))
            .unwrap_err();
        let ApiError::Validation { violations } = err else {
            panic!("expected validation error");
        };
        assert_eq!(violations[0].reason, "is required");
    }

    #[test]
    fn empty_strings_are_rejected() {
        let schema = InputSchema {
            fields: LOGIN_FIELDS,
        };
        let err = schema
            .validate(&json!({"email": "a@b.com", "password": ""}))
            .unwrap_err();
        let ApiError::Validation { violations } = err else {
            panic!("expected validation error");
        };
        assert_eq!(violations[0].reason, "must not be empty");
    }

    #[test]
    fn email_format() {
        assert!(is_email("a@b.com"));
        assert!(is_email("first.last@sub.example.org"));
        assert!(!is_email("plain"));
        assert!(!is_email("@b.com"));
        assert!(!is_email("a@"));
        assert!(!is_email("a@nodot"));
        assert!(!is_email("a b@c.com"));
    }

    #[test]
    fn type_kinds() {
        let schema = InputSchema {
            fields: &[
                FieldRule {
                    name: "year",
                    kind: FieldKind::Integer,
                    required: true,
                },
                FieldRule {
                    name: "is_active",
                    kind: FieldKind::Boolean,
                    required: false,
                },
            ],
        };
        schema
            .validate(&json!({"year": 2021, "is_active": false}))
            .unwrap();
        let err = schema
            .validate(&json!({"year": "2021", "is_active": "no"}))
            .unwrap_err();
        let ApiError::Validation { violations } = err else {
            panic!("expected validation error");
        };
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn envelope_shape_check() {
        ResponseShape::Envelope
            .check(&json!({"responseCode": "00", "responseMessage": "OK"}))
            .unwrap();
        assert!(ResponseShape::Envelope
            .check(&json!({"status": "ok"}))
            .is_err());
        ResponseShape::Message
            .check(&json!({"message": "not found"}))
            .unwrap();
    }
}
