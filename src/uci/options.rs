//! Typed engine options negotiated through `option` / `setoption`.
//!
//! Every option owns its current value and a trigger that is called when a
//! `setoption` changes that value. Buttons have no value and fire on every
//! press.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    #[error("option name is empty")]
    EmptyName,
    #[error("default {default} of option {name} is not within [{min}, {max}]")]
    DefaultOutOfRange {
        name: String,
        default: String,
        min: String,
        max: String,
    },
    #[error("combo option {0} has no values")]
    EmptyCombo(String),
    #[error("default {default} is not one of the values of combo option {name}")]
    DefaultNotInCombo { name: String, default: String },
    #[error("value {} is illegal for option {name}", .value.as_deref().unwrap_or("<none>"))]
    InvalidValue { name: String, value: Option<String> },
}

/// The protocol `type` of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Check,
    Spin,
    Combo,
    String,
    Button,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptionKind::Check => "check",
            OptionKind::Spin => "spin",
            OptionKind::Combo => "combo",
            OptionKind::String => "string",
            OptionKind::Button => "button",
        })
    }
}

/// A named, user-settable engine parameter.
pub trait UciOption: Send {
    fn name(&self) -> &str;

    fn kind(&self) -> OptionKind;

    /// Parse and store a new value.
    ///
    /// `None` stands for a `setoption` without a `value` part. On error the
    /// stored value is left untouched and the trigger is not called.
    fn set_value(&mut self, value: Option<&str>) -> Result<(), OptionError>;

    /// The `option name ... type ...` declaration line.
    fn to_uci(&self) -> String;
}

/// Callback invoked with the new value of an option.
pub type Trigger<T> = Box<dyn FnMut(&T) + Send>;

/// Name, value, default and trigger shared by the valued option kinds.
struct Valued<T> {
    name: String,
    value: T,
    default: T,
    trigger: Trigger<T>,
}

impl<T: Clone + PartialEq> Valued<T> {
    fn new(name: &str, default: T, trigger: Trigger<T>) -> Result<Self, OptionError> {
        Ok(Valued {
            name: checked_name(name)?,
            value: default.clone(),
            default,
            trigger,
        })
    }

    fn store(&mut self, value: T) {
        if value != self.value {
            self.value = value;
            (self.trigger)(&self.value);
        }
    }

    fn invalid(&self, value: Option<&str>) -> OptionError {
        OptionError::InvalidValue {
            name: self.name.clone(),
            value: value.map(str::to_string),
        }
    }

    fn header(&self, kind: OptionKind) -> String {
        header(&self.name, kind)
    }
}

fn checked_name(name: &str) -> Result<String, OptionError> {
    if name.trim().is_empty() {
        Err(OptionError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

fn header(name: &str, kind: OptionKind) -> String {
    format!("option name {name} type {kind}")
}

/// A boolean option. Only the exact words `true` and `false` are accepted.
pub struct CheckOption(Valued<bool>);

impl CheckOption {
    /// # Errors
    ///
    /// Fails if `name` is blank.
    pub fn new(
        name: &str,
        default: bool,
        trigger: impl FnMut(&bool) + Send + 'static,
    ) -> Result<Self, OptionError> {
        Valued::new(name, default, Box::new(trigger)).map(CheckOption)
    }

    #[must_use]
    pub fn value(&self) -> bool {
        self.0.value
    }
}

impl UciOption for CheckOption {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Check
    }

    fn set_value(&mut self, value: Option<&str>) -> Result<(), OptionError> {
        let parsed = match value {
            Some("true") => true,
            Some("false") => false,
            _ => return Err(self.0.invalid(value)),
        };
        self.0.store(parsed);
        Ok(())
    }

    fn to_uci(&self) -> String {
        format!("{} default {}", self.0.header(OptionKind::Check), self.0.default)
    }
}

/// Numeric types a [`SpinOption`] can hold.
pub trait SpinValue: Copy + PartialOrd + FromStr + fmt::Display + Send + 'static {}

impl<N> SpinValue for N where N: Copy + PartialOrd + FromStr + fmt::Display + Send + 'static {}

/// A bounded numeric option; `min` and `max` are inclusive.
pub struct SpinOption<N: SpinValue> {
    inner: Valued<N>,
    min: N,
    max: N,
}

pub type IntegerSpinOption = SpinOption<i32>;
pub type LongSpinOption = SpinOption<i64>;

impl<N: SpinValue> SpinOption<N> {
    /// # Errors
    ///
    /// Fails if `name` is blank or if `min <= default <= max` does not hold.
    pub fn new(
        name: &str,
        default: N,
        min: N,
        max: N,
        trigger: impl FnMut(&N) + Send + 'static,
    ) -> Result<Self, OptionError> {
        let inner = Valued::new(name, default, Box::new(trigger))?;
        if !(min <= default && default <= max) {
            return Err(OptionError::DefaultOutOfRange {
                name: inner.name,
                default: default.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(SpinOption { inner, min, max })
    }

    #[must_use]
    pub fn value(&self) -> N {
        self.inner.value
    }

    #[must_use]
    pub fn bounds(&self) -> (N, N) {
        (self.min, self.max)
    }
}

impl<N: SpinValue> UciOption for SpinOption<N> {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Spin
    }

    fn set_value(&mut self, value: Option<&str>) -> Result<(), OptionError> {
        let parsed = value
            .and_then(|v| v.parse::<N>().ok())
            .filter(|v| self.min <= *v && *v <= self.max)
            .ok_or_else(|| self.inner.invalid(value))?;
        self.inner.store(parsed);
        Ok(())
    }

    fn to_uci(&self) -> String {
        format!(
            "{} default {} min {} max {}",
            self.inner.header(OptionKind::Spin),
            self.inner.default,
            self.min,
            self.max
        )
    }
}

/// An option restricted to a fixed list of strings.
pub struct ComboOption {
    inner: Valued<String>,
    values: Vec<String>,
}

impl ComboOption {
    /// Values keep their declaration order; repeated values are dropped.
    ///
    /// # Errors
    ///
    /// Fails if `name` is blank, `values` is empty or `default` is not one
    /// of `values`.
    pub fn new<I, S>(
        name: &str,
        default: &str,
        values: I,
        trigger: impl FnMut(&String) + Send + 'static,
    ) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = Valued::new(name, default.to_string(), Box::new(trigger))?;
        let mut unique: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        if unique.is_empty() {
            return Err(OptionError::EmptyCombo(inner.name));
        }
        if !unique.iter().any(|v| v == default) {
            return Err(OptionError::DefaultNotInCombo {
                name: inner.name,
                default: default.to_string(),
            });
        }
        Ok(ComboOption {
            inner,
            values: unique,
        })
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.inner.value
    }
}

impl UciOption for ComboOption {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Combo
    }

    fn set_value(&mut self, value: Option<&str>) -> Result<(), OptionError> {
        match value {
            Some(v) if self.values.iter().any(|known| known == v) => {
                self.inner.store(v.to_string());
                Ok(())
            }
            _ => Err(self.inner.invalid(value)),
        }
    }

    fn to_uci(&self) -> String {
        let mut line = format!(
            "{} default {}",
            self.inner.header(OptionKind::Combo),
            self.inner.default
        );
        for value in &self.values {
            line.push_str(" var ");
            line.push_str(value);
        }
        line
    }
}

/// A free-form text option.
pub struct StringOption(Valued<String>);

impl StringOption {
    /// # Errors
    ///
    /// Fails if `name` is blank.
    pub fn new(
        name: &str,
        default: &str,
        trigger: impl FnMut(&String) + Send + 'static,
    ) -> Result<Self, OptionError> {
        Valued::new(name, default.to_string(), Box::new(trigger)).map(StringOption)
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.0.value
    }
}

impl UciOption for StringOption {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn kind(&self) -> OptionKind {
        OptionKind::String
    }

    fn set_value(&mut self, value: Option<&str>) -> Result<(), OptionError> {
        let value = value.ok_or_else(|| self.0.invalid(None))?;
        self.0.store(value.to_string());
        Ok(())
    }

    fn to_uci(&self) -> String {
        let default = if self.0.default.is_empty() {
            "<empty>"
        } else {
            self.0.default.as_str()
        };
        format!("{} default {default}", self.0.header(OptionKind::String))
    }
}

/// A value-less option whose trigger fires on every press.
pub struct ButtonOption {
    name: String,
    trigger: Box<dyn FnMut() + Send>,
}

impl ButtonOption {
    /// # Errors
    ///
    /// Fails if `name` is blank.
    pub fn new(name: &str, trigger: impl FnMut() + Send + 'static) -> Result<Self, OptionError> {
        Ok(ButtonOption {
            name: checked_name(name)?,
            trigger: Box::new(trigger),
        })
    }
}

impl UciOption for ButtonOption {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> OptionKind {
        OptionKind::Button
    }

    fn set_value(&mut self, value: Option<&str>) -> Result<(), OptionError> {
        if let Some(value) = value {
            return Err(OptionError::InvalidValue {
                name: self.name.clone(),
                value: Some(value.to_string()),
            });
        }
        (self.trigger)();
        Ok(())
    }

    fn to_uci(&self) -> String {
        header(&self.name, OptionKind::Button)
    }
}

/// Options of the selected engine, in registration order.
#[derive(Default)]
pub struct OptionTable {
    options: Vec<Box<dyn UciOption>>,
}

impl OptionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option, replacing any option with the same name in place.
    pub fn insert(&mut self, option: Box<dyn UciOption>) {
        match self.position(option.name()) {
            Some(index) => self.options[index] = option,
            None => self.options.push(option),
        }
    }

    /// Add an option unless one with the same name is already present.
    ///
    /// # Returns
    ///
    /// `true` if the option was added.
    pub fn insert_if_absent(&mut self, option: Box<dyn UciOption>) -> bool {
        if self.contains(option.name()) {
            false
        } else {
            self.options.push(option);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn UciOption>> {
        self.options.iter_mut().find(|o| o.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn UciOption> {
        self.options.iter().map(|o| o.as_ref() as &dyn UciOption)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|o| o.name() == name)
    }
}

impl FromIterator<Box<dyn UciOption>> for OptionTable {
    fn from_iter<I: IntoIterator<Item = Box<dyn UciOption>>>(iter: I) -> Self {
        let mut table = OptionTable::new();
        for option in iter {
            table.insert(option);
        }
        table
    }
}
