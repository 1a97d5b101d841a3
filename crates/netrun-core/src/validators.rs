//! # Validators
//!
//! Pure predicate objects that check a single attribute value against a
//! rule. A validator never mutates the value it checks.
//!
//! ## Attachment Contract
//!
//! Each validator declares the primitive types it can check
//! ([`Validator::supported_types`]). Attaching it to any other attribute
//! type is a definition-time error (see
//! [`crate::attribute::Attribute::define`]); a check against a value of an
//! unsupported kind therefore never happens at runtime.

use std::fmt;

use crate::error::{DefinitionError, ValidationError};
use crate::value::{AttrValue, Primitive};

/// Lowest valid TCP/UDP port.
pub const PORT_MIN: i64 = 1;

/// Highest valid TCP/UDP port.
pub const PORT_MAX: i64 = 65535;

/// A value rule attached to an attribute or action parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validator {
    /// Value must be one of a fixed set of strings.
    Choice(ChoiceValidator),
    /// Value must be an integer inside an inclusive range.
    Range(RangeValidator),
}

impl Validator {
    /// Build a choice validator.
    pub fn choice<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice(ChoiceValidator::new(choices))
    }

    /// Build a range validator over `[min, max]`.
    ///
    /// Fails with `InvalidRange` when `min > max`.
    pub fn range(min: i64, max: i64) -> Result<Self, DefinitionError> {
        RangeValidator::new(min, max).map(Self::Range)
    }

    /// Build the port preset, `[1, 65535]`.
    pub fn port() -> Self {
        Self::Range(RangeValidator::port())
    }

    /// Kind name used in diagnostics and schema specifications.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Choice(_) => "choice",
            Self::Range(r) if r.port => "port",
            Self::Range(_) => "range",
        }
    }

    /// The primitive types this validator can be attached to.
    pub fn supported_types(&self) -> &'static [Primitive] {
        match self {
            Self::Choice(_) => &[Primitive::Str],
            Self::Range(_) => &[Primitive::Int],
        }
    }

    /// Whether the validator may be attached to attributes of `primitive`.
    pub fn supports(&self, primitive: Primitive) -> bool {
        self.supported_types().contains(&primitive)
    }

    /// Check `value`. Null values are not checked.
    pub fn validate(&self, value: &AttrValue) -> Result<(), ValidationError> {
        match self {
            Self::Choice(v) => v.validate(value),
            Self::Range(v) => v.validate(value),
        }
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Choice(v) => write!(f, "choice[{}]", v.choices.join(", ")),
            Self::Range(v) => write!(f, "{}[{}, {}]", self.kind(), v.min, v.max),
        }
    }
}

/// Membership in a fixed set of strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceValidator {
    choices: Vec<String>,
}

impl ChoiceValidator {
    /// Create a validator accepting exactly `choices`. Duplicates are dropped.
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for choice in choices {
            let choice = choice.into();
            if !unique.contains(&choice) {
                unique.push(choice);
            }
        }
        Self { choices: unique }
    }

    /// The permitted values, in declaration order.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    fn validate(&self, value: &AttrValue) -> Result<(), ValidationError> {
        match value {
            AttrValue::Null => Ok(()),
            AttrValue::String(s) if self.choices.iter().any(|c| c == s) => Ok(()),
            AttrValue::String(s) => Err(ValidationError::InvalidChoice {
                value: s.clone(),
                choices: self.choices.clone(),
            }),
            other => Err(ValidationError::InvalidChoice {
                value: other.to_json().to_string(),
                choices: self.choices.clone(),
            }),
        }
    }
}

/// Inclusive integer range.
///
/// The port preset is a distinct kind even though its bounds could be
/// spelled as a plain range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValidator {
    min: i64,
    max: i64,
    port: bool,
}

impl RangeValidator {
    /// Create a validator over `[min, max]`.
    pub fn new(min: i64, max: i64) -> Result<Self, DefinitionError> {
        if min > max {
            return Err(DefinitionError::InvalidRange { min, max });
        }
        Ok(Self {
            min,
            max,
            port: false,
        })
    }

    /// The port preset.
    pub fn port() -> Self {
        Self {
            min: PORT_MIN,
            max: PORT_MAX,
            port: true,
        }
    }

    /// Inclusive lower bound.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Inclusive upper bound.
    pub fn max(&self) -> i64 {
        self.max
    }

    fn validate(&self, value: &AttrValue) -> Result<(), ValidationError> {
        match value {
            AttrValue::Null => Ok(()),
            AttrValue::Integer(i) if (self.min..=self.max).contains(i) => Ok(()),
            AttrValue::Integer(i) => Err(ValidationError::InvalidRange {
                value: *i,
                min: self.min,
                max: self.max,
            }),
            // Non-integers can only reach a range validator through an
            // unchecked path; report them against the lower bound.
            _ => Err(ValidationError::InvalidRange {
                value: self.min.saturating_sub(1),
                min: self.min,
                max: self.max,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_accepts_member() {
        let v = Validator::choice(["eos", "nxos"]);
        assert!(v.validate(&AttrValue::from("eos")).is_ok());
    }

    #[test]
    fn test_choice_rejects_non_member() {
        let v = Validator::choice(["eos", "nxos"]);
        let err = v.validate(&AttrValue::from("ios")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidChoice {
                value: "ios".into(),
                choices: vec!["eos".into(), "nxos".into()],
            }
        );
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let v = Validator::range(1, 4094).unwrap();
        assert!(v.validate(&AttrValue::Integer(1)).is_ok());
        assert!(v.validate(&AttrValue::Integer(4094)).is_ok());
        assert!(matches!(
            v.validate(&AttrValue::Integer(0)),
            Err(ValidationError::InvalidRange { value: 0, .. })
        ));
        assert!(matches!(
            v.validate(&AttrValue::Integer(4095)),
            Err(ValidationError::InvalidRange { value: 4095, .. })
        ));
    }

    #[test]
    fn test_port_preset() {
        let v = Validator::port();
        assert_eq!(v.kind(), "port");
        assert!(v.validate(&AttrValue::Integer(22)).is_ok());
        assert!(v.validate(&AttrValue::Integer(65536)).is_err());
    }

    #[test]
    fn test_port_bounds_as_plain_range_stay_range() {
        let v = Validator::range(PORT_MIN, PORT_MAX).unwrap();
        assert_eq!(v.kind(), "range");
        assert_ne!(v, Validator::port());
        assert_eq!(v.to_string(), "range[1, 65535]");
        assert_eq!(Validator::port().to_string(), "port[1, 65535]");
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert_eq!(
            Validator::range(9, 1).unwrap_err(),
            DefinitionError::InvalidRange { min: 9, max: 1 }
        );
        assert!(Validator::range(5, 5).is_ok());
    }

    #[test]
    fn test_null_is_not_checked() {
        assert!(Validator::port().validate(&AttrValue::Null).is_ok());
        assert!(Validator::choice(["a"]).validate(&AttrValue::Null).is_ok());
    }

    #[test]
    fn test_supported_types() {
        assert!(Validator::choice(["a"]).supports(Primitive::Str));
        assert!(!Validator::choice(["a"]).supports(Primitive::Int));
        assert!(Validator::range(0, 1).unwrap().supports(Primitive::Int));
        assert!(!Validator::range(0, 1).unwrap().supports(Primitive::Bool));
    }
}
