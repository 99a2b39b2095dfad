//! Field validators.
//!
//! A validator is a predicate plus the message reported when it fails. Every
//! validator attached to a field runs, so a single field can report several
//! messages at once. Validators also describe themselves as JSON-schema
//! keywords for the OpenAPI document.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::{Map, Value};

/// Decimal and binary size units for [`FileSize`].
pub const KB: u64 = 1_000;
pub const MB: u64 = 1_000 * KB;
pub const GB: u64 = 1_000 * MB;
pub const KIB: u64 = 1_024;
pub const MIB: u64 = 1_024 * KIB;
pub const GIB: u64 = 1_024 * MIB;

pub trait Validator: Send + Sync {
    /// Check `value`, returning the failure message.
    ///
    /// Values of the wrong JSON type are accepted: the field's own type check
    /// reports those.
    fn validate(&self, value: &Value) -> Result<(), String>;

    /// Add the JSON-schema keywords expressing this validator to `schema`.
    /// `schema` already carries the field's `type`.
    fn json_schema(&self, _schema: &mut Map<String, Value>) {}
}

pub type BoxedValidator = Arc<dyn Validator>;

/// Python-ish rendering used in messages: strings unquoted, integral floats
/// without a fraction.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.1}"),
            _ => n.to_string(),
        },
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn join(values: &[Value]) -> String {
    values.iter().map(display_value).collect::<Vec<_>>().join(", ")
}

fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn is_array_schema(schema: &Map<String, Value>) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("array")
}

// ── Length ──────────────────────────────────────────────────────────────

/// Length of a string (in characters), list or mapping.
#[derive(Debug, Clone, Default)]
pub struct Length {
    min: Option<usize>,
    max: Option<usize>,
    equal: Option<usize>,
}

impl Length {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn equal(mut self, equal: usize) -> Self {
        self.equal = Some(equal);
        self
    }
}

impl Validator for Length {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => return Ok(()),
        };
        if let Some(equal) = self.equal {
            if len != equal {
                return Err(format!("Length must be {equal}."));
            }
            return Ok(());
        }
        let too_short = self.min.is_some_and(|min| len < min);
        let too_long = self.max.is_some_and(|max| len > max);
        match (too_short || too_long, self.min, self.max) {
            (false, _, _) => Ok(()),
            (true, Some(min), Some(max)) => Err(format!("Length must be between {min} and {max}.")),
            (true, Some(min), None) => Err(format!("Shorter than minimum length {min}.")),
            (true, None, Some(max)) => Err(format!("Longer than maximum length {max}.")),
            (true, None, None) => Ok(()),
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        let (min_key, max_key) = if is_array_schema(schema) {
            ("minItems", "maxItems")
        } else {
            ("minLength", "maxLength")
        };
        let (min, max) = match self.equal {
            Some(equal) => (Some(equal), Some(equal)),
            None => (self.min, self.max),
        };
        if let Some(min) = min {
            schema.insert(min_key.into(), Value::from(min));
        }
        if let Some(max) = max {
            schema.insert(max_key.into(), Value::from(max));
        }
    }
}

// ── Range ───────────────────────────────────────────────────────────────

/// Numeric bounds, inclusive unless marked exclusive.
#[derive(Debug, Clone)]
pub struct Range {
    min: Option<f64>,
    max: Option<f64>,
    min_inclusive: bool,
    max_inclusive: bool,
}

impl Default for Range {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            min_inclusive: true,
            max_inclusive: true,
        }
    }
}

impl Range {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn min_exclusive(mut self) -> Self {
        self.min_inclusive = false;
        self
    }

    pub fn max_exclusive(mut self) -> Self {
        self.max_inclusive = false;
        self
    }

    fn min_op(&self) -> &'static str {
        if self.min_inclusive {
            "greater than or equal to"
        } else {
            "greater than"
        }
    }

    fn max_op(&self) -> &'static str {
        if self.max_inclusive {
            "less than or equal to"
        } else {
            "less than"
        }
    }
}

impl Validator for Range {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(n) = value.as_f64() else {
            return Ok(());
        };
        let below = self.min.is_some_and(|min| {
            if self.min_inclusive {
                n < min
            } else {
                n <= min
            }
        });
        let above = self.max.is_some_and(|max| {
            if self.max_inclusive {
                n > max
            } else {
                n >= max
            }
        });
        if !below && !above {
            return Ok(());
        }
        Err(match (self.min, self.max) {
            (Some(min), Some(max)) => format!(
                "Must be {} {} and {} {}.",
                self.min_op(),
                display_number(min),
                self.max_op(),
                display_number(max)
            ),
            (Some(min), None) => format!("Must be {} {}.", self.min_op(), display_number(min)),
            (None, Some(max)) => format!("Must be {} {}.", self.max_op(), display_number(max)),
            (None, None) => return Ok(()),
        })
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        if let Some(min) = self.min {
            schema.insert("minimum".into(), json_number(min));
            if !self.min_inclusive {
                schema.insert("exclusiveMinimum".into(), Value::Bool(true));
            }
        }
        if let Some(max) = self.max {
            schema.insert("maximum".into(), json_number(max));
            if !self.max_inclusive {
                schema.insert("exclusiveMaximum".into(), Value::Bool(true));
            }
        }
    }
}

// ── Membership ──────────────────────────────────────────────────────────

/// The value must be one of `choices`.
#[derive(Debug, Clone)]
pub struct OneOf {
    choices: Vec<Value>,
}

impl OneOf {
    pub fn new<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for OneOf {
    fn validate(&self, value: &Value) -> Result<(), String> {
        if self.choices.contains(value) {
            Ok(())
        } else {
            Err(format!("Must be one of: {}.", join(&self.choices)))
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        schema.insert("enum".into(), Value::Array(self.choices.clone()));
    }
}

/// The value must not be any of `values`.
#[derive(Debug, Clone)]
pub struct NoneOf {
    values: Vec<Value>,
}

impl NoneOf {
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for NoneOf {
    fn validate(&self, value: &Value) -> Result<(), String> {
        if self.values.contains(value) {
            Err("Invalid input.".to_string())
        } else {
            Ok(())
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        let mut not = Map::new();
        not.insert("enum".into(), Value::Array(self.values.clone()));
        schema.insert("not".into(), Value::Object(not));
    }
}

#[derive(Debug, Clone)]
pub struct Equal {
    comparable: Value,
}

impl Equal {
    pub fn new(comparable: impl Into<Value>) -> Self {
        Self {
            comparable: comparable.into(),
        }
    }
}

impl Validator for Equal {
    fn validate(&self, value: &Value) -> Result<(), String> {
        if *value == self.comparable {
            Ok(())
        } else {
            Err(format!("Must be equal to {}.", display_value(&self.comparable)))
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        schema.insert("enum".into(), Value::Array(vec![self.comparable.clone()]));
    }
}

/// Every element of a list must be one of `choices`.
#[derive(Debug, Clone)]
pub struct ContainsOnly {
    choices: Vec<Value>,
}

impl ContainsOnly {
    pub fn new<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for ContainsOnly {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(items) = value.as_array() else {
            return Ok(());
        };
        if items.iter().all(|item| self.choices.contains(item)) {
            Ok(())
        } else {
            Err(format!(
                "One or more of the choices you made was not in: {}.",
                join(&self.choices)
            ))
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        if let Some(Value::Object(items)) = schema.get_mut("items") {
            items.insert("enum".into(), Value::Array(self.choices.clone()));
        }
    }
}

/// No element of a list may be one of `values`.
#[derive(Debug, Clone)]
pub struct ContainsNoneOf {
    values: Vec<Value>,
}

impl ContainsNoneOf {
    pub fn new<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for ContainsNoneOf {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(items) = value.as_array() else {
            return Ok(());
        };
        if items.iter().any(|item| self.values.contains(item)) {
            Err(format!(
                "One or more of the choices you made was in: {}.",
                join(&self.values)
            ))
        } else {
            Ok(())
        }
    }
}

// ── Formats ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Regexp {
    regex: Regex,
}

impl Regexp {
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }

    /// Compile `pattern`. The error is the regex compiler's message.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::new(Regex::new(pattern)?))
    }
}

impl Validator for Regexp {
    fn validate(&self, value: &Value) -> Result<(), String> {
        match value.as_str() {
            Some(s) if !self.regex.is_match(s) => {
                Err("String does not match expected pattern.".to_string())
            }
            _ => Ok(()),
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        schema.insert("pattern".into(), Value::String(self.regex.as_str().to_string()));
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
            .unwrap_or_else(|_| unreachable!("static email pattern compiles"))
    })
}

pub(crate) fn is_email(s: &str) -> bool {
    let Some((_, domain)) = s.rsplit_once('@') else {
        return false;
    };
    email_regex().is_match(s) && (domain.contains('.') || domain == "localhost")
}

#[derive(Debug, Clone, Default)]
pub struct Email;

impl Validator for Email {
    fn validate(&self, value: &Value) -> Result<(), String> {
        match value.as_str() {
            Some(s) if !is_email(s) => Err("Not a valid email address.".to_string()),
            _ => Ok(()),
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        schema.insert("format".into(), Value::String("email".into()));
    }
}

/// Absolute URL check. Hosts need a TLD unless they are `localhost` or an
/// IP address; `relative(true)` also accepts paths such as `/pets/1`.
#[derive(Debug, Clone)]
pub struct Url {
    relative: bool,
    schemes: Vec<String>,
    require_tld: bool,
}

impl Default for Url {
    fn default() -> Self {
        Self {
            relative: false,
            schemes: ["http", "https", "ftp", "ftps"]
                .into_iter()
                .map(String::from)
                .collect(),
            require_tld: true,
        }
    }
}

impl Url {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    pub fn require_tld(mut self, require_tld: bool) -> Self {
        self.require_tld = require_tld;
        self
    }

    pub fn schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schemes = schemes.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn accepts(&self, s: &str) -> bool {
        if s.trim() != s || s.is_empty() {
            return false;
        }
        match url::Url::parse(s) {
            Ok(parsed) => {
                if !self.schemes.iter().any(|scheme| scheme == parsed.scheme()) {
                    return false;
                }
                match parsed.host() {
                    Some(url::Host::Domain(domain)) => {
                        !self.require_tld || domain == "localhost" || domain.contains('.')
                    }
                    Some(_) => true,
                    None => false,
                }
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.relative && s.starts_with('/') && !s.contains(char::is_whitespace)
            }
            Err(_) => false,
        }
    }
}

impl Validator for Url {
    fn validate(&self, value: &Value) -> Result<(), String> {
        match value.as_str() {
            Some(s) if !self.accepts(s) => Err("Not a valid URL.".to_string()),
            _ => Ok(()),
        }
    }

    fn json_schema(&self, schema: &mut Map<String, Value>) {
        schema.insert("format".into(), Value::String("url".into()));
    }
}

// ── Files ───────────────────────────────────────────────────────────────

fn display_size(bytes: u64) -> String {
    const UNITS: [(u64, &str); 6] = [
        (GIB, "GiB"),
        (GB, "GB"),
        (MIB, "MiB"),
        (MB, "MB"),
        (KIB, "KiB"),
        (KB, "KB"),
    ];
    for (unit, label) in UNITS {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{} {label}", bytes / unit);
        }
    }
    format!("{bytes} B")
}

fn file_size(value: &Value) -> Option<u64> {
    value.get("size").and_then(Value::as_u64)
}

/// Bounds on the size of an uploaded file, in bytes.
///
/// ```
/// use apiweave_core::validate::{FileSize, MB};
///
/// let limit = FileSize::new().max(5 * MB);
/// ```
#[derive(Debug, Clone)]
pub struct FileSize {
    min: Option<u64>,
    max: Option<u64>,
    min_inclusive: bool,
    max_inclusive: bool,
}

impl Default for FileSize {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            min_inclusive: true,
            max_inclusive: true,
        }
    }
}

impl FileSize {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, bytes: u64) -> Self {
        self.min = Some(bytes);
        self
    }

    pub fn max(mut self, bytes: u64) -> Self {
        self.max = Some(bytes);
        self
    }

    pub fn min_exclusive(mut self) -> Self {
        self.min_inclusive = false;
        self
    }

    pub fn max_exclusive(mut self) -> Self {
        self.max_inclusive = false;
        self
    }
}

impl Validator for FileSize {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(size) = file_size(value) else {
            return Ok(());
        };
        let below = self.min.is_some_and(|min| {
            if self.min_inclusive {
                size < min
            } else {
                size <= min
            }
        });
        let above = self.max.is_some_and(|max| {
            if self.max_inclusive {
                size > max
            } else {
                size >= max
            }
        });
        if !below && !above {
            return Ok(());
        }
        let min_op = if self.min_inclusive {
            "greater than or equal to"
        } else {
            "greater than"
        };
        let max_op = if self.max_inclusive {
            "less than or equal to"
        } else {
            "less than"
        };
        Err(match (self.min, self.max) {
            (Some(min), Some(max)) => format!(
                "File size must be {min_op} {} and {max_op} {}.",
                display_size(min),
                display_size(max)
            ),
            (Some(min), None) => format!("File size must be {min_op} {}.", display_size(min)),
            (None, Some(max)) => format!("File size must be {max_op} {}.", display_size(max)),
            (None, None) => return Ok(()),
        })
    }
}

/// Accepted file extensions (`[".png", ".jpg"]`), compared case-insensitively.
#[derive(Debug, Clone)]
pub struct FileType {
    accept: Vec<String>,
}

impl FileType {
    pub fn new<I, S>(accept: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut accept: Vec<String> = accept
            .into_iter()
            .map(|ext| ext.into().to_lowercase())
            .collect();
        accept.sort();
        accept.dedup();
        Self { accept }
    }
}

impl Validator for FileType {
    fn validate(&self, value: &Value) -> Result<(), String> {
        let Some(filename) = value.get("filename").and_then(Value::as_str) else {
            return Ok(());
        };
        let extension = filename
            .rfind('.')
            .map(|i| filename[i..].to_lowercase())
            .unwrap_or_default();
        if self.accept.contains(&extension) {
            Ok(())
        } else {
            Err(format!(
                "Not an allowed file type. Allowed file types: [{}]",
                self.accept.join(", ")
            ))
        }
    }
}

// ── Custom ──────────────────────────────────────────────────────────────

/// Arbitrary check given as a closure.
///
/// ```
/// use apiweave_core::validate::Predicate;
///
/// let even = Predicate::new(|v| v.as_i64().is_some_and(|n| n % 2 == 0));
/// let named = Predicate::new(|v| v.is_string()).message("Must be text.");
/// ```
#[derive(Clone)]
pub struct Predicate {
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
    message: String,
}

impl Predicate {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            check: Arc::new(check),
            message: "Invalid input.".to_string(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl Validator for Predicate {
    fn validate(&self, value: &Value) -> Result<(), String> {
        if (self.check)(value) {
            Ok(())
        } else {
            Err(self.message.clone())
        }
    }
}
