//! Typed values exchanged between steps and process implementations

use serde::Serialize;

/// The closed set of value kinds a process parameter or output can carry.
///
/// Bindings are checked against these kinds before a process is invoked;
/// there is no implicit coercion between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterKind {
    Bool,
    Int,
    Double,
    String,
}

impl std::fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterKind::Bool => write!(f, "bool"),
            ParameterKind::Int => write!(f, "int"),
            ParameterKind::Double => write!(f, "double"),
            ParameterKind::String => write!(f, "string"),
        }
    }
}

/// Schema entry for one named parameter of a process run operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterSpec {
    /// The process-local parameter name
    pub name: String,

    /// Expected scalar kind (element kind for arrays)
    pub kind: ParameterKind,

    /// Whether `Null` is an acceptable value
    pub nullable: bool,

    /// Whether the parameter gathers multiple bindings into an array
    pub array: bool,
}

impl ParameterSpec {
    /// A required scalar parameter
    pub fn required(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
            array: false,
        }
    }

    /// A nullable scalar parameter
    pub fn nullable(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: true,
            array: false,
        }
    }

    /// An array parameter gathering same-named bindings
    pub fn array(name: &str, kind: ParameterKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: false,
            array: true,
        }
    }
}

/// A value flowing through the pipeline context.
///
/// Tagged variant over the scalar kinds, their array forms, and `Null`.
/// Process implementations produce and consume these; the engine never
/// inspects the payloads beyond kind checking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypedValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    BoolArray(Vec<bool>),
    IntArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            TypedValue::BoolArray(_)
                | TypedValue::IntArray(_)
                | TypedValue::DoubleArray(_)
                | TypedValue::StringArray(_)
        )
    }

    /// Check this value against a scalar kind. `Null` never matches.
    pub fn matches_scalar(&self, kind: ParameterKind) -> bool {
        matches!(
            (self, kind),
            (TypedValue::Bool(_), ParameterKind::Bool)
                | (TypedValue::Int(_), ParameterKind::Int)
                | (TypedValue::Double(_), ParameterKind::Double)
                | (TypedValue::String(_), ParameterKind::String)
        )
    }

    /// Check this value against an array of the given element kind.
    pub fn matches_array(&self, kind: ParameterKind) -> bool {
        matches!(
            (self, kind),
            (TypedValue::BoolArray(_), ParameterKind::Bool)
                | (TypedValue::IntArray(_), ParameterKind::Int)
                | (TypedValue::DoubleArray(_), ParameterKind::Double)
                | (TypedValue::StringArray(_), ParameterKind::String)
        )
    }

    /// Human-readable kind label used in step failure messages.
    pub fn kind_label(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Bool(_) => "bool",
            TypedValue::Int(_) => "int",
            TypedValue::Double(_) => "double",
            TypedValue::String(_) => "string",
            TypedValue::BoolArray(_) => "bool[]",
            TypedValue::IntArray(_) => "int[]",
            TypedValue::DoubleArray(_) => "double[]",
            TypedValue::StringArray(_) => "string[]",
        }
    }
}

/// Collect scalar values of one kind into the matching array value.
///
/// Returns `None` if any element is not a scalar of the requested kind.
pub fn collect_array(kind: ParameterKind, values: &[TypedValue]) -> Option<TypedValue> {
    match kind {
        ParameterKind::Bool => values
            .iter()
            .map(|v| match v {
                TypedValue::Bool(b) => Some(*b),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(TypedValue::BoolArray),
        ParameterKind::Int => values
            .iter()
            .map(|v| match v {
                TypedValue::Int(i) => Some(*i),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(TypedValue::IntArray),
        ParameterKind::Double => values
            .iter()
            .map(|v| match v {
                TypedValue::Double(d) => Some(*d),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(TypedValue::DoubleArray),
        ParameterKind::String => values
            .iter()
            .map(|v| match v {
                TypedValue::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(TypedValue::StringArray),
    }
}
