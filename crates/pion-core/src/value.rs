//! Dynamic values stored in host properties and carried by change events.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A property value as seen by the host element.
///
/// Equality follows identity semantics: numbers compare by value (with `NaN`
/// equal to itself), strings by content and objects by pointer.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Rc<dyn Any>),
}

impl Value {
    pub fn object<T: Any>(value: T) -> Self {
        Value::Object(Rc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Object(object) => write!(f, "Object({:p})", Rc::as_ptr(object)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Object(_) => f.write_str("[object Object]"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value))
    }
}

/// Types that can live in a host property.
pub trait PropertyValue: Clone + PartialEq + 'static {
    fn into_value(self) -> Value;
    fn from_value(value: &Value) -> Option<Self>;
}

impl PropertyValue for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl PropertyValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl PropertyValue for f64 {
    fn into_value(self) -> Value {
        Value::Number(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_number()
    }
}

impl PropertyValue for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl<T: PropertyValue> PropertyValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(value) => value.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Boolean,
    String,
    Number,
}

/// Types an attribute can be declared as, with their string coercions.
pub trait AttributeValue: PropertyValue {
    const KIND: AttributeKind;

    fn type_default() -> Self;

    /// Coerces the raw attribute (`None` when absent).
    fn from_attribute(raw: Option<&str>, default: &Self) -> Self;

    /// Attribute text to reflect, `None` removes the attribute.
    fn to_attribute(&self) -> Option<String>;

    /// Coerces whatever currently sits in the host property.
    fn from_property(value: &Value, default: &Self) -> Self;
}

impl AttributeValue for bool {
    const KIND: AttributeKind = AttributeKind::Boolean;

    fn type_default() -> Self {
        false
    }

    fn from_attribute(raw: Option<&str>, _default: &Self) -> Self {
        raw.is_some()
    }

    fn to_attribute(&self) -> Option<String> {
        self.then(String::new)
    }

    fn from_property(value: &Value, _default: &Self) -> Self {
        match value {
            // attribute text forwarded by the element is presence, not content
            Value::String(_) => true,
            other => other.truthy(),
        }
    }
}

impl AttributeValue for f64 {
    const KIND: AttributeKind = AttributeKind::Number;

    fn type_default() -> Self {
        0.0
    }

    fn from_attribute(raw: Option<&str>, default: &Self) -> Self {
        raw.map(parse_float)
            .filter(|n| !n.is_nan())
            .unwrap_or(*default)
    }

    fn to_attribute(&self) -> Option<String> {
        Some(format_number(*self))
    }

    fn from_property(value: &Value, default: &Self) -> Self {
        match value {
            Value::Number(n) => *n,
            Value::String(s) => Self::from_attribute(Some(s), default),
            Value::Bool(b) => f64::from(u8::from(*b)),
            _ => *default,
        }
    }
}

impl AttributeValue for String {
    const KIND: AttributeKind = AttributeKind::String;

    fn type_default() -> Self {
        String::new()
    }

    fn from_attribute(raw: Option<&str>, default: &Self) -> Self {
        raw.map_or_else(|| default.clone(), str::to_owned)
    }

    fn to_attribute(&self) -> Option<String> {
        Some(self.clone())
    }

    fn from_property(value: &Value, default: &Self) -> Self {
        match value {
            Value::Null => default.clone(),
            other => other.to_string(),
        }
    }
}

/// Attribute text for a reflected property: `null` and `false` remove the
/// attribute, `true` becomes the empty string and everything else is
/// stringified.
pub fn reflect_value(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(String::new()),
        other => Some(other.to_string()),
    }
}

/// Parses the longest numeric prefix of `input`, `NaN` when there is none.
pub fn parse_float(input: &str) -> f64 {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut cursor = fraction_start;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        mantissa_digits += cursor - fraction_start;
        if mantissa_digits > 0 {
            end = cursor;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut cursor = end + 1;
        if matches!(bytes.get(cursor), Some(b'+') | Some(b'-')) {
            cursor += 1;
        }
        let exponent_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor > exponent_start {
            end = cursor;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// `open-on-focus` -> `openOnFocus`
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// `openOnFocus` -> `open-on-focus`
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_uppercase() {
            out.push('-');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_semantics() {
        assert_eq!(Value::Number(f64::NAN), Value::Number(f64::NAN));
        assert_eq!(Value::from("a"), Value::from("a".to_string()));
        assert_ne!(Value::Bool(false), Value::Null);

        let shared = Value::object(vec![1, 2]);
        assert_eq!(shared, shared.clone());
        assert_ne!(shared, Value::object(vec![1, 2]));
    }

    #[test]
    fn parse_float_takes_numeric_prefix() {
        assert_eq!(parse_float("20"), 20.0);
        assert_eq!(parse_float("  3.5px"), 3.5);
        assert_eq!(parse_float("-.5"), -0.5);
        assert_eq!(parse_float("1e3x"), 1000.0);
        assert_eq!(parse_float("2e"), 2.0);
        assert_eq!(parse_float("Infinity"), f64::INFINITY);
        assert!(parse_float("abc").is_nan());
        assert!(parse_float("").is_nan());
        assert!(parse_float(".").is_nan());
    }

    #[test]
    fn number_attribute_falls_back_on_nan() {
        assert_eq!(f64::from_attribute(Some("12"), &8.0), 12.0);
        assert_eq!(f64::from_attribute(Some("nope"), &8.0), 8.0);
        assert_eq!(f64::from_attribute(None, &8.0), 8.0);
        assert_eq!(20.0f64.to_attribute().as_deref(), Some("20"));
        assert_eq!(2.5f64.to_attribute().as_deref(), Some("2.5"));
    }

    #[test]
    fn boolean_attribute_is_presence_only() {
        assert!(bool::from_attribute(Some(""), &false));
        assert!(bool::from_attribute(Some("false"), &false));
        assert!(!bool::from_attribute(None, &true));
        assert_eq!(true.to_attribute().as_deref(), Some(""));
        assert_eq!(false.to_attribute(), None);
        assert!(bool::from_property(&Value::from(""), &false));
        assert!(!bool::from_property(&Value::Null, &false));
    }

    #[test]
    fn reflected_values() {
        assert_eq!(reflect_value(&Value::Null), None);
        assert_eq!(reflect_value(&Value::Bool(false)), None);
        assert_eq!(reflect_value(&Value::Bool(true)).as_deref(), Some(""));
        assert_eq!(reflect_value(&Value::Number(4.0)).as_deref(), Some("4"));
        assert_eq!(reflect_value(&Value::from("x")).as_deref(), Some("x"));
    }

    #[test]
    fn case_conversion() {
        assert_eq!(to_camel_case("open-on-focus"), "openOnFocus");
        assert_eq!(to_camel_case("opened"), "opened");
        assert_eq!(to_kebab_case("openOnFocus"), "open-on-focus");
        assert_eq!(to_kebab_case(&to_camel_case("max-count")), "max-count");
    }

    #[test]
    fn optional_values_map_null() {
        assert_eq!(Option::<f64>::from_value(&Value::Null), Some(None));
        assert_eq!(Option::<f64>::from_value(&Value::Number(1.0)), Some(Some(1.0)));
        assert_eq!(Option::<f64>::from_value(&Value::Bool(true)), None);
        assert!(None::<bool>.into_value().is_null());
    }
}
