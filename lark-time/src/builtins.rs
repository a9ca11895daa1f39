use std::sync::Arc;

use num_traits::ToPrimitive;

use crate::{
    error::RuntimeError,
    runtime::Globals,
    runtime_value::{Arguments, Builtin, Instant, RuntimeValue, Span},
};

/// A source for the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Reads the system's wall clock; consecutive readings are not guaranteed to increase.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Always returns the same instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub Instant);

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        self.0
    }
}

impl<F: Fn() -> Instant + Send + Sync> Clock for F {
    fn now(&self) -> Instant {
        self()
    }
}

/// The units `timedelta` accepts, with their weight.
const UNITS: [(&str, Span); 5] = [
    ("hours", Span::HOUR),
    ("minutes", Span::MINUTE),
    ("seconds", Span::SECOND),
    ("milliseconds", Span::MILLISECOND),
    ("nanoseconds", Span::NANOSECOND),
];

/// Returns the current instant of `clock`; takes no arguments.
pub fn now(
    function: &Arc<str>,
    clock: &dyn Clock,
    arguments: &Arguments,
) -> Result<RuntimeValue, RuntimeError> {
    check_no_positional(function, arguments)?;
    if !arguments.keywords.is_empty() {
        return Err(RuntimeError::UnexpectedKeywords {
            function: function.clone(),
            count: arguments.keywords.len(),
        });
    }
    Ok(RuntimeValue::Instant(clock.now()))
}

/// Sums up keyword arguments like `hours=1, seconds=30` into a single span.
///
/// Units are weighted and added in the order the caller passed them. Both steps wrap around on
/// overflow, so only in that case the order can make a difference.
pub fn delta(function: &Arc<str>, arguments: &Arguments) -> Result<RuntimeValue, RuntimeError> {
    check_no_positional(function, arguments)?;

    let mut total = Span::ZERO;
    for (name, value) in &arguments.keywords {
        let RuntimeValue::String(name) = name else {
            return Err(RuntimeError::InvalidKeywordName {
                function: function.clone(),
                type_name: name.type_name(),
            });
        };
        let RuntimeValue::Int(value) = value else {
            return Err(RuntimeError::InvalidUnitValue {
                unit: name.to_string(),
                type_name: value.type_name(),
            });
        };
        let Some(value) = value.to_i64() else {
            return Err(RuntimeError::UnitOverflow {
                unit: name.to_string(),
            });
        };
        let Some((_, weight)) = UNITS.iter().find(|(unit, _)| **unit == **name) else {
            return Err(RuntimeError::UnknownUnit(name.to_string()));
        };
        total = total + weight.wrapping_mul(value);
    }

    Ok(RuntimeValue::Span(total))
}

fn check_no_positional(function: &Arc<str>, arguments: &Arguments) -> Result<(), RuntimeError> {
    if arguments.positional.is_empty() {
        Ok(())
    } else {
        Err(RuntimeError::UnexpectedPositional {
            function: function.clone(),
            count: arguments.positional.len(),
            expected: 0,
        })
    }
}

/// Configures the time builtins and binds them into a namespace.
///
/// ```
/// use lark_time::{builtins::TimeModule, runtime::Globals};
///
/// let mut globals = Globals::new();
/// TimeModule::new().register(&mut globals);
/// let module = globals.exec("ten_minutes = timedelta(minutes=10)").unwrap();
/// assert_eq!(module.get("ten_minutes").unwrap().to_string(), "10m0s");
/// ```
#[derive(Clone)]
pub struct TimeModule {
    clock: Arc<dyn Clock>,
    now_name: Arc<str>,
    delta_name: Arc<str>,
}

impl Default for TimeModule {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            now_name: "now".into(),
            delta_name: "timedelta".into(),
        }
    }
}

impl TimeModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the clock `now()` reads from.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Binds `now()` under a different name.
    pub fn with_now_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.now_name = name.into();
        self
    }

    /// Binds `timedelta()` under a different name.
    pub fn with_delta_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.delta_name = name.into();
        self
    }

    pub fn now_builtin(&self) -> Builtin {
        let clock = self.clock.clone();
        let name = self.now_name.clone();
        Builtin::new(self.now_name.clone(), move |arguments| {
            now(&name, clock.as_ref(), arguments)
        })
    }

    pub fn delta_builtin(&self) -> Builtin {
        let name = self.delta_name.clone();
        Builtin::new(self.delta_name.clone(), move |arguments| delta(&name, arguments))
    }

    pub fn register(&self, globals: &mut Globals) {
        tracing::debug!(now = %self.now_name, delta = %self.delta_name, "registering time builtins");
        globals.insert(self.now_name.to_string(), self.now_builtin().into());
        globals.insert(self.delta_name.to_string(), self.delta_builtin().into());
    }
}

/// Binds `type`, `str` and `hash`, which expose the value protocol to scripts.
pub fn register_core(globals: &mut Globals) {
    tracing::debug!("registering core builtins");
    globals.insert(
        "type".to_owned(),
        Builtin::new("type", |arguments| {
            let value = single_argument("type", arguments)?;
            Ok(value.type_name().into())
        })
        .into(),
    );
    globals.insert(
        "str".to_owned(),
        Builtin::new("str", |arguments| {
            let value = single_argument("str", arguments)?;
            Ok(value.to_string().as_str().into())
        })
        .into(),
    );
    globals.insert(
        "hash".to_owned(),
        Builtin::new("hash", |arguments| {
            let value = single_argument("hash", arguments)?;
            Ok(RuntimeValue::Int(value.hash()?.into()))
        })
        .into(),
    );
}

fn single_argument<'a>(
    function: &str,
    arguments: &'a Arguments,
) -> Result<&'a RuntimeValue, RuntimeError> {
    if !arguments.keywords.is_empty() {
        return Err(RuntimeError::UnexpectedKeywords {
            function: function.into(),
            count: arguments.keywords.len(),
        });
    }
    match arguments.positional.as_slice() {
        [value] => Ok(value),
        positional => Err(RuntimeError::UnexpectedPositional {
            function: function.into(),
            count: positional.len(),
            expected: 1,
        }),
    }
}
