use std::collections::BTreeMap;

use crate::{
    compiler::{
        ast::{Expression, ExpressionKind, Statement},
        diagnostic::Diagnostic,
        parser,
    },
    error::RuntimeError,
    runtime_value::{Arguments, RuntimeValue},
};

/// The global namespace of a script.
///
/// Builtins are bound explicitly before running any code, e.g. using
/// [`TimeModule::register`](crate::builtins::TimeModule::register).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Globals {
    values: BTreeMap<String, RuntimeValue>,
    frozen: bool,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`, returning the previous value.
    ///
    /// # Panics
    ///
    /// Panics if the namespace was already frozen.
    pub fn insert(&mut self, name: String, value: RuntimeValue) -> Option<RuntimeValue> {
        assert!(!self.frozen, "cannot bind `{name}` in frozen globals");
        self.values.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuntimeValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freezes all values, after which the namespace can be shared between threads but no longer
    /// be modified.
    pub fn freeze(&mut self) {
        for value in self.values.values() {
            value.freeze();
        }
        self.frozen = true;
    }

    /// Runs all statements of `code` with this namespace as its predeclared names.
    ///
    /// Assignments are bound into a new module namespace, which is frozen and returned once all
    /// statements ran. Execution stops at the first error.
    pub fn exec(&self, code: &str) -> Result<Globals, Diagnostic> {
        let statements = parser::parse(code)?;
        tracing::debug!(statements = statements.len(), "executing code");

        let mut module = Globals::new();
        for statement in statements {
            let scope = Scope {
                predeclared: self,
                module: &module,
            };
            match statement {
                Statement::Assign { name, value } => {
                    let value = scope.evaluate(&value)?;
                    module.insert(name, value);
                }
                Statement::Expression(expression) => {
                    scope.evaluate(&expression)?;
                }
            }
        }
        module.freeze();
        Ok(module)
    }

    /// Evaluates a single expression against this namespace.
    pub fn eval(&self, code: &str) -> Result<RuntimeValue, Diagnostic> {
        let expression = parser::parse_expression(code)?;
        let module = Globals::new();
        Scope {
            predeclared: self,
            module: &module,
        }
        .evaluate(&expression)
    }
}

/// Name resolution during evaluation; module bindings shadow predeclared ones.
struct Scope<'a> {
    predeclared: &'a Globals,
    module: &'a Globals,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Option<&RuntimeValue> {
        self.module.get(name).or_else(|| self.predeclared.get(name))
    }

    fn evaluate(&self, expression: &Expression) -> Result<RuntimeValue, Diagnostic> {
        let fail = |error: RuntimeError| Diagnostic::error(error, expression.range.clone());
        match &expression.kind {
            ExpressionKind::None => Ok(RuntimeValue::None),
            ExpressionKind::Bool(value) => Ok(RuntimeValue::Bool(*value)),
            ExpressionKind::Int(value) => Ok(RuntimeValue::Int(value.clone())),
            ExpressionKind::String(value) => Ok(RuntimeValue::String(value.as_str().into())),
            ExpressionKind::Name(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| fail(RuntimeError::Undefined(name.clone()))),
            ExpressionKind::Not(operand) => {
                Ok(RuntimeValue::Bool(!self.evaluate(operand)?.truth()))
            }
            ExpressionKind::Negate(operand) => self.evaluate(operand)?.negate().map_err(fail),
            ExpressionKind::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                lhs.binary(*op, &rhs).map_err(fail)
            }
            ExpressionKind::Compare { op, lhs, rhs } => {
                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;
                lhs.compare(*op, &rhs)
                    .map(RuntimeValue::Bool)
                    .map_err(fail)
            }
            ExpressionKind::Call {
                callee,
                positional,
                keywords,
            } => {
                let callee = self.evaluate(callee)?;
                let RuntimeValue::Builtin(builtin) = &callee else {
                    return Err(fail(RuntimeError::NotCallable(callee.type_name())));
                };
                let arguments = Arguments {
                    positional: positional
                        .iter()
                        .map(|argument| self.evaluate(argument))
                        .collect::<Result<_, _>>()?,
                    keywords: keywords
                        .iter()
                        .map(|(name, argument)| {
                            Ok((RuntimeValue::from(name.as_str()), self.evaluate(argument)?))
                        })
                        .collect::<Result<_, Diagnostic>>()?,
                };
                builtin.call(&arguments).map_err(fail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{builtins, error::ErrorKind, runtime_value::Span};

    use super::*;

    fn globals() -> Globals {
        let mut globals = Globals::new();
        builtins::register_core(&mut globals);
        globals
    }

    fn runtime_error(diagnostic: &Diagnostic) -> &RuntimeError {
        diagnostic
            .downcast_ref::<RuntimeError>()
            .expect("should be a runtime error")
    }

    #[test]
    fn exec_binds_into_frozen_module() {
        let module = globals()
            .exec("a = 1\nb = a + 2; c = \"x\" + 'y'")
            .expect("should run");

        assert_eq!(module.get("b"), Some(&RuntimeValue::Int(3.into())));
        assert_eq!(module.get("c"), Some(&RuntimeValue::from("xy")));
        assert_eq!(module.get("type"), None);
        assert!(module.is_frozen());
    }

    #[test]
    fn module_bindings_shadow_predeclared_names() {
        let module = globals().exec("str = 1\nx = str + 1").expect("should run");

        assert_eq!(module.get("x"), Some(&RuntimeValue::Int(2.into())));
    }

    #[test]
    #[should_panic(expected = "frozen globals")]
    fn frozen_globals_reject_bindings() {
        let mut module = globals().exec("a = 1").expect("should run");

        module.insert("b".to_owned(), RuntimeValue::None);
    }

    #[test]
    fn undefined_names_report_their_range() {
        let code = "x = 1 + missing";
        let diagnostic = globals().exec(code).expect_err("should fail");

        assert_eq!(
            runtime_error(&diagnostic),
            &RuntimeError::Undefined("missing".to_owned())
        );
        assert_eq!(&code[diagnostic.range.clone()], "missing");
    }

    #[test]
    fn calling_a_non_function() {
        let diagnostic = globals().eval("1()").expect_err("should fail");

        assert_eq!(runtime_error(&diagnostic).kind(), ErrorKind::Type);
    }

    #[test]
    fn not_uses_truthiness() {
        let globals = globals();

        assert_eq!(
            globals.eval("not 0").expect("should evaluate"),
            RuntimeValue::Bool(true)
        );
        assert_eq!(
            globals.eval("not 'text'").expect("should evaluate"),
            RuntimeValue::Bool(false)
        );
    }

    #[test]
    fn core_builtins() {
        let module = globals()
            .exec("t = type(1)\ns = str(-5)\nh = hash('a')")
            .expect("should run");

        assert_eq!(module.get("t"), Some(&RuntimeValue::from("int")));
        assert_eq!(module.get("s"), Some(&RuntimeValue::from("-5")));
        assert_eq!(
            module.get("h"),
            Some(&RuntimeValue::Int(97u32.wrapping_mul(16_777_619).into()))
        );
    }

    #[test]
    fn spans_compare_in_scripts() {
        let mut globals = globals();
        globals.insert("a".to_owned(), Span::SECOND.into());
        globals.insert("b".to_owned(), Span::MINUTE.into());

        let value = globals.eval("a < b").expect("should evaluate");

        assert_eq!(value, RuntimeValue::Bool(true));
    }
}
