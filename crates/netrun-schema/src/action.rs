//! # Compiled Actions
//!
//! An [`Action`] is the resolved form of one `actions:` entry: its typed
//! parameter table, static variables and task file. Invoking it checks and
//! coerces the supplied arguments and renders a `Task` that imports the
//! role.
//!
//! ## Coercion
//!
//! | Declared | Accepted                                   |
//! |----------|--------------------------------------------|
//! | `str`    | strings; integers and booleans are rendered |
//! | `int`    | integers; decimal strings                  |
//! | `bool`   | booleans; the strings `true` and `false`   |
//! | `list`   | lists                                      |
//! | `dict`   | mappings                                   |
//! | model    | instances of the model, serialized in place |
//!
//! Null counts as not supplied.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use netrun_core::{AttrValue, Document, Entity, EntityType, Primitive, Validator};
use netrun_models::{new_import_role, to_task, IMPORT_ROLE};
use serde_json::Value;
use tracing::debug;

use crate::error::SchemaError;

/// Declared type of an action parameter.
#[derive(Debug, Clone)]
pub enum ParamType {
    Str,
    Int,
    Bool,
    List,
    Dict,
    /// An instance of a model declared by the same specification.
    Model {
        /// Model name as declared.
        name: String,
        /// The synthesized type.
        ty: Arc<EntityType>,
    },
}

impl ParamType {
    /// The primitive validators are checked against.
    pub fn primitive(&self) -> Primitive {
        match self {
            Self::Str => Primitive::Str,
            Self::Int => Primitive::Int,
            Self::Bool => Primitive::Bool,
            Self::List => Primitive::List,
            Self::Dict => Primitive::Dict,
            Self::Model { .. } => Primitive::Object,
        }
    }

    fn coerce(&self, value: AttrValue) -> Result<AttrValue, AttrValue> {
        match (self, value) {
            (Self::Str, v @ AttrValue::String(_)) => Ok(v),
            (Self::Str, AttrValue::Integer(i)) => Ok(AttrValue::String(i.to_string())),
            (Self::Str, AttrValue::Boolean(b)) => Ok(AttrValue::String(b.to_string())),

            (Self::Int, v @ AttrValue::Integer(_)) => Ok(v),
            (Self::Int, AttrValue::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(AttrValue::Integer(i)),
                Err(_) => Err(AttrValue::String(s)),
            },

            (Self::Bool, v @ AttrValue::Boolean(_)) => Ok(v),
            (Self::Bool, AttrValue::String(s)) => match s.as_str() {
                "true" => Ok(AttrValue::Boolean(true)),
                "false" => Ok(AttrValue::Boolean(false)),
                _ => Err(AttrValue::String(s)),
            },

            (Self::List, v @ AttrValue::List(_)) => Ok(v),
            (Self::Dict, v @ AttrValue::Dict(_)) => Ok(v),

            (Self::Model { ty, .. }, AttrValue::Object(entity)) if entity.is_instance_of(ty) => {
                Ok(AttrValue::Object(entity))
            }

            (_, other) => Err(other),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model { name, .. } => f.write_str(name),
            other => f.write_str(other.primitive().as_str()),
        }
    }
}

/// One resolved action parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub(crate) name: String,
    pub(crate) kind: ParamType,
    pub(crate) required: bool,
    /// Already coerced and validated.
    pub(crate) default: Option<Value>,
    pub(crate) validators: Vec<Validator>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParamType {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The default substituted when the argument is not supplied.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Coerce `value` to the declared type and run the validators in order.
    pub(crate) fn check(&self, action: &str, value: AttrValue) -> Result<Value, SchemaError> {
        let value = self
            .kind
            .coerce(value)
            .map_err(|rejected| SchemaError::ArgumentType {
                action: action.to_string(),
                argument: self.name.clone(),
                expected: self.kind.to_string(),
                actual: rejected_kind(&rejected),
            })?;
        for validator in &self.validators {
            validator
                .validate(&value)
                .map_err(|source| SchemaError::InvalidArgument {
                    action: action.to_string(),
                    argument: self.name.clone(),
                    source,
                })?;
        }
        Ok(value.to_json())
    }
}

fn rejected_kind(value: &AttrValue) -> String {
    match value {
        AttrValue::Object(entity) => entity.type_name().to_string(),
        other => other.kind().to_string(),
    }
}

/// A compiled action.
#[derive(Debug, Clone)]
pub struct Action {
    pub(crate) name: String,
    pub(crate) params: Vec<Parameter>,
    pub(crate) vars: Document,
    pub(crate) tasks_from: Option<String>,
}

impl Action {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Static variables merged over the arguments.
    pub fn vars(&self) -> &Document {
        &self.vars
    }

    pub fn tasks_from(&self) -> Option<&str> {
        self.tasks_from.as_deref()
    }

    /// Check `args` and render the task importing `role`.
    ///
    /// Task variables hold the arguments in parameter order followed by
    /// the static variables, which win on conflict. When a name is given
    /// more than once the last value is used.
    pub(crate) fn invoke<I, K, V>(
        &self,
        role: &str,
        task_action: &str,
        args: I,
    ) -> Result<Entity, SchemaError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let mut supplied: BTreeMap<String, AttrValue> = BTreeMap::new();
        for (key, value) in args {
            let key = key.into();
            if self.param(&key).is_none() {
                return Err(SchemaError::UnknownArgument {
                    action: self.name.clone(),
                    argument: key,
                });
            }
            supplied.insert(key, value.into());
        }

        let mut vars = Document::new();
        for param in &self.params {
            let given = supplied.remove(&param.name).filter(|v| !v.is_null());

            let value = match (given, &param.default) {
                (Some(v), _) => param.check(&self.name, v)?,
                (None, Some(default)) => default.clone(),
                (None, None) if param.required => {
                    return Err(SchemaError::MissingRequiredArgument {
                        action: self.name.clone(),
                        argument: param.name.clone(),
                    })
                }
                (None, None) => continue,
            };
            vars.insert(param.name.clone(), value);
        }
        for (key, value) in &self.vars {
            vars.insert(key.clone(), value.clone());
        }

        let mut task = to_task(&new_import_role(role, self.tasks_from.as_deref())?)?;
        if task_action != IMPORT_ROLE {
            task.set("action", task_action)?;
        }
        task.set("vars", vars)?;

        debug!(action = %self.name, role, "action invoked");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrun_core::{Attribute, ValidationError};
    use serde_json::json;

    fn param(name: &str, kind: ParamType) -> Parameter {
        Parameter {
            name: name.to_string(),
            kind,
            required: false,
            default: None,
            validators: Vec::new(),
        }
    }

    fn action(params: Vec<Parameter>) -> Action {
        Action {
            name: "configure".to_string(),
            params,
            vars: Document::new(),
            tasks_from: Some("configure".to_string()),
        }
    }

    #[test]
    fn test_int_accepts_decimal_strings() {
        let p = param("vlan_id", ParamType::Int);
        assert_eq!(p.check("a", AttrValue::from("42")).unwrap(), json!(42));
        assert_eq!(p.check("a", AttrValue::from(" 7 ")).unwrap(), json!(7));
        assert!(matches!(
            p.check("a", AttrValue::from("forty")),
            Err(SchemaError::ArgumentType { ref expected, ref actual, .. })
                if expected == "int" && actual == "str"
        ));
        assert!(p.check("a", AttrValue::from(true)).is_err());
    }

    #[test]
    fn test_bool_accepts_literal_strings() {
        let p = param("enabled", ParamType::Bool);
        assert_eq!(p.check("a", AttrValue::from("true")).unwrap(), json!(true));
        assert_eq!(p.check("a", AttrValue::from("false")).unwrap(), json!(false));
        assert!(p.check("a", AttrValue::from("yes")).is_err());
        assert!(p.check("a", AttrValue::from(1)).is_err());
    }

    #[test]
    fn test_str_renders_scalars() {
        let p = param("label", ParamType::Str);
        assert_eq!(p.check("a", AttrValue::from(10)).unwrap(), json!("10"));
        assert_eq!(p.check("a", AttrValue::from(false)).unwrap(), json!("false"));
        assert!(p.check("a", AttrValue::from(json!([1]))).is_err());
    }

    #[test]
    fn test_containers_are_not_converted() {
        let list = param("ports", ParamType::List);
        let dict = param("options", ParamType::Dict);
        assert_eq!(list.check("a", AttrValue::from(json!([1, 2]))).unwrap(), json!([1, 2]));
        assert!(list.check("a", AttrValue::from("1,2")).is_err());
        assert_eq!(dict.check("a", AttrValue::from(json!({"k": 1}))).unwrap(), json!({"k": 1}));
        assert!(dict.check("a", AttrValue::from("test")).is_err());
    }

    #[test]
    fn test_model_parameter_serializes_instance() {
        let vlan = EntityType::builder("vlan")
            .attr("vlan_id", Attribute::integer())
            .build()
            .unwrap();
        let other = EntityType::builder("port").build().unwrap();
        let p = param(
            "vlan",
            ParamType::Model {
                name: "vlan".to_string(),
                ty: Arc::clone(&vlan),
            },
        );

        let instance = Entity::new(&vlan, [("vlan_id", 5)]).unwrap();
        assert_eq!(p.check("a", AttrValue::from(instance)).unwrap(), json!({"vlan_id": 5}));

        let foreign = Entity::empty(&other).unwrap();
        assert!(matches!(
            p.check("a", AttrValue::from(foreign)),
            Err(SchemaError::ArgumentType { ref expected, ref actual, .. })
                if expected == "vlan" && actual == "port"
        ));
        assert!(p.check("a", AttrValue::from("foo")).is_err());
    }

    #[test]
    fn test_validators_run_after_coercion() {
        let mut p = param("vlan_id", ParamType::Int);
        p.validators = vec![Validator::range(1, 4094).unwrap()];
        assert_eq!(p.check("a", AttrValue::from("100")).unwrap(), json!(100));
        assert!(matches!(
            p.check("a", AttrValue::from("5000")),
            Err(SchemaError::InvalidArgument {
                source: ValidationError::InvalidRange { value: 5000, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_invoke_merges_static_vars_last() {
        let mut a = action(vec![param("state", ParamType::Str), param("mtu", ParamType::Int)]);
        a.vars.insert("state".to_string(), json!("present"));

        let task = a
            .invoke("network-runner", IMPORT_ROLE, [("mtu", "9000"), ("state", "absent")])
            .unwrap();
        let vars = task.get_dict("vars").unwrap();
        assert_eq!(vars.keys().collect::<Vec<_>>(), ["state", "mtu"]);
        assert_eq!(vars.get("state"), Some(&json!("present")));
        assert_eq!(vars.get("mtu"), Some(&json!(9000)));
        assert_eq!(
            Value::Object(task.get_dict("args").unwrap().clone()),
            json!({"name": "network-runner", "tasks_from": "configure"})
        );
    }

    #[test]
    fn test_invoke_null_is_not_supplied() {
        let mut required = param("vlan_id", ParamType::Int);
        required.required = true;
        let mut defaulted = param("state", ParamType::Str);
        defaulted.default = Some(json!("present"));
        let a = action(vec![required, defaulted]);

        assert!(matches!(
            a.invoke("r", IMPORT_ROLE, [("vlan_id", Value::Null)]),
            Err(SchemaError::MissingRequiredArgument { ref argument, .. }) if argument == "vlan_id"
        ));

        let task = a
            .invoke("r", IMPORT_ROLE, [("vlan_id", json!(3)), ("state", Value::Null)])
            .unwrap();
        assert_eq!(task.get_dict("vars").unwrap().get("state"), Some(&json!("present")));
    }

    #[test]
    fn test_invoke_last_duplicate_wins() {
        let a = action(vec![param("mtu", ParamType::Int)]);
        let task = a
            .invoke("r", IMPORT_ROLE, [("mtu", json!(1500)), ("mtu", json!(9000))])
            .unwrap();
        assert_eq!(task.get_dict("vars").unwrap().get("mtu"), Some(&json!(9000)));

        let a = action(vec![param("a", ParamType::Int), param("b", ParamType::Int)]);
        let task = a
            .invoke(
                "r",
                IMPORT_ROLE,
                [("a", json!(1)), ("b", json!(100)), ("b", json!(200))],
            )
            .unwrap();
        let vars = task.get_dict("vars").unwrap();
        assert_eq!(vars.get("a"), Some(&json!(1)));
        assert_eq!(vars.get("b"), Some(&json!(200)));
    }

    #[test]
    fn test_invoke_custom_task_action() {
        let a = action(Vec::new());
        let task = a.invoke("r", "include_role", Vec::<(&str, Value)>::new()).unwrap();
        assert_eq!(task.get_str("action").unwrap(), Some("include_role"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        #[test]
        fn int_strings_coerce_to_their_value(n in any::<i64>()) {
            let p = Parameter {
                name: "n".to_string(),
                kind: ParamType::Int,
                required: true,
                default: None,
                validators: Vec::new(),
            };
            prop_assert_eq!(p.check("a", AttrValue::from(n.to_string())).unwrap(), json!(n));
            prop_assert_eq!(p.check("a", AttrValue::from(n)).unwrap(), json!(n));
        }

        #[test]
        fn rendered_scalars_are_strings(n in any::<i64>(), b in any::<bool>()) {
            let p = Parameter {
                name: "s".to_string(),
                kind: ParamType::Str,
                required: false,
                default: None,
                validators: Vec::new(),
            };
            prop_assert_eq!(p.check("a", AttrValue::from(n)).unwrap(), json!(n.to_string()));
            prop_assert_eq!(p.check("a", AttrValue::from(b)).unwrap(), json!(b.to_string()));
        }
    }
}
