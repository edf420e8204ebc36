use serde_json::{Map, Value};

/// One argument passed to a console method.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleArg {
    Undefined,
    Value(Value),
    /// A callable; carries its name when it has one.
    Function(Option<String>),
}

impl From<Value> for ConsoleArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ConsoleArg {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for ConsoleArg {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<Map<String, Value>> for ConsoleArg {
    fn from(value: Map<String, Value>) -> Self {
        Self::Value(Value::Object(value))
    }
}

impl ConsoleArg {
    fn render(&self) -> Option<String> {
        match self {
            Self::Undefined => None,
            Self::Value(Value::String(s)) => Some(s.clone()),
            Self::Value(other) => Some(other.to_string()),
            Self::Function(name) => Some(format!(
                "[Function: {}]",
                name.as_deref().unwrap_or("anonymous")
            )),
        }
    }
}

/// Joins every argument the way a console prints them.
pub fn render_args(args: &[ConsoleArg]) -> String {
    args.iter()
        .filter_map(ConsoleArg::render)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Splits console arguments into a message and optional context.
///
/// With two or more arguments, a trailing plain object becomes the context
/// and is left out of the message.
pub fn format_console_args(args: &[ConsoleArg]) -> (String, Option<Map<String, Value>>) {
    if let [head @ .., ConsoleArg::Value(Value::Object(context))] = args
        && !head.is_empty()
    {
        return (render_args(head), Some(context.clone()));
    }
    (render_args(args), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strings_verbatim_and_values_stringified() {
        let args = [
            ConsoleArg::from("count:"),
            ConsoleArg::Value(json!(3)),
            ConsoleArg::Value(json!([1, "a"])),
            ConsoleArg::Value(Value::Null),
        ];
        assert_eq!(format_console_args(&args), ("count: 3 [1,\"a\"] null".to_string(), None));
    }

    #[test]
    fn test_undefined_is_skipped() {
        let args = [ConsoleArg::from("a"), ConsoleArg::Undefined, ConsoleArg::from("b")];
        assert_eq!(render_args(&args), "a b");
    }

    #[test]
    fn test_functions() {
        let args = [
            ConsoleArg::Function(Some("handler".to_string())),
            ConsoleArg::Function(None),
        ];
        assert_eq!(render_args(&args), "[Function: handler] [Function: anonymous]");
    }

    #[test]
    fn test_trailing_object_becomes_context() {
        let args = [ConsoleArg::from("saved"), ConsoleArg::Value(json!({"id": 7}))];
        let (message, context) = format_console_args(&args);
        assert_eq!(message, "saved");
        assert_eq!(context, json!({"id": 7}).as_object().cloned());
    }

    #[test]
    fn test_lone_object_stays_in_message() {
        let args = [ConsoleArg::Value(json!({"id": 7}))];
        assert_eq!(format_console_args(&args), ("{\"id\":7}".to_string(), None));
    }

    #[test]
    fn test_trailing_array_is_not_context() {
        let args = [ConsoleArg::from("ids"), ConsoleArg::Value(json!([1, 2]))];
        assert_eq!(format_console_args(&args), ("ids [1,2]".to_string(), None));
    }
}
