//! Executable schema modules.
//!
//! A `.js` schema source is a CommonJS-style module evaluated with QuickJS.
//! Whatever string it assigns to `module.exports` is the schema text:
//!
//! ```js
//! const user = "type User { id: ID! name: String! }";
//! module.exports = user + "\ntype Query { users: [User] }";
//! ```
//!
//! Each call reads the file again and evaluates it in a runtime created for
//! that call alone, so edits to the module between two publishes are always
//! picked up.

use std::path::Path;

use rquickjs::convert::Coerced;
use rquickjs::function::Rest;
use rquickjs::{Context, Ctx, FromJs, Function, Object, Runtime, Value};

use crate::error::{DgkitError, DgkitResult};

/// Memory available to a single module evaluation.
const MEMORY_LIMIT_BYTES: usize = 32 * 1024 * 1024;

/// Stack available to a single module evaluation.
const MAX_STACK_SIZE_BYTES: usize = 1024 * 1024;

/// Reads and evaluates a schema module.
///
/// # Errors
/// Returns `SchemaRead` if the file cannot be read and `Script` if evaluation
/// fails or the module does not export a string.
pub async fn load_module(path: &Path) -> DgkitResult<String> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DgkitError::schema_read(path, e))?;
    evaluate_module(path, &source)
}

/// Evaluates module source in a fresh QuickJS runtime.
///
/// `path` is only used for error reporting.
///
/// # Errors
/// Returns `Script` if evaluation fails or `module.exports` is not a string.
pub fn evaluate_module(path: &Path, source: &str) -> DgkitResult<String> {
    let runtime = Runtime::new().map_err(|e| DgkitError::script(path, e.to_string()))?;
    runtime.set_memory_limit(MEMORY_LIMIT_BYTES);
    runtime.set_max_stack_size(MAX_STACK_SIZE_BYTES);
    let context = Context::full(&runtime).map_err(|e| DgkitError::script(path, e.to_string()))?;

    let wrapped = format!(
        r#"
(function() {{
    var module = {{ exports: {{}} }};
    var exports = module.exports;
    {source}
    ;
    return module.exports;
}})()
"#
    );

    context.with(|ctx| {
        setup_console(&ctx).map_err(|e| DgkitError::script(path, e.to_string()))?;

        match ctx.eval::<Value, _>(wrapped.as_bytes()) {
            Ok(value) => exported_string(path, value),
            Err(rquickjs::Error::Exception) => Err(DgkitError::script(path, exception_message(&ctx))),
            Err(e) => Err(DgkitError::script(path, e.to_string())),
        }
    })
}

fn exported_string(path: &Path, value: Value<'_>) -> DgkitResult<String> {
    match value.as_string() {
        Some(s) => s
            .to_string()
            .map_err(|e| DgkitError::script(path, e.to_string())),
        None => Err(DgkitError::script(
            path,
            format!(
                "module.exports must be a string, got {:?}",
                value.type_of()
            ),
        )),
    }
}

fn exception_message(ctx: &Ctx<'_>) -> String {
    let caught = ctx.catch();
    if let Some(exception) = caught.as_exception() {
        return exception
            .message()
            .unwrap_or_else(|| "uncaught exception".to_string());
    }
    match caught.as_string().and_then(|s| s.to_string().ok()) {
        Some(message) => message,
        None => format!("uncaught {:?}", caught.type_of()),
    }
}

/// Joins console arguments with spaces. Strings are kept verbatim and other
/// values are printed as JSON, falling back to `String(value)`.
fn render_args(args: &[Value<'_>]) -> String {
    args.iter().map(render_value).collect::<Vec<_>>().join(" ")
}

fn render_value(value: &Value<'_>) -> String {
    if let Some(s) = value.as_string() {
        return s.to_string().unwrap_or_default();
    }
    let ctx = value.ctx();
    if let Some(json) = ctx
        .json_stringify(value.clone())
        .ok()
        .flatten()
        .and_then(|s| s.to_string().ok())
    {
        return json;
    }
    match Coerced::<String>::from_js(ctx, value.clone()) {
        Ok(Coerced(text)) => text,
        Err(_) => {
            // Clear the pending exception.
            let _ = ctx.catch();
            format!("<{:?}>", value.type_of())
        }
    }
}

fn setup_console<'js>(ctx: &Ctx<'js>) -> Result<(), rquickjs::Error> {
    let console = Object::new(ctx.clone())?;

    console.set(
        "log",
        Function::new(ctx.clone(), |args: Rest<Value<'js>>| {
            let msg = render_args(&args.0);
            tracing::info!(target: "dgkit::script", message = %msg, "console.log");
        })?,
    )?;
    console.set(
        "warn",
        Function::new(ctx.clone(), |args: Rest<Value<'js>>| {
            let msg = render_args(&args.0);
            tracing::warn!(target: "dgkit::script", message = %msg, "console.warn");
        })?,
    )?;
    console.set(
        "error",
        Function::new(ctx.clone(), |args: Rest<Value<'js>>| {
            let msg = render_args(&args.0);
            tracing::error!(target: "dgkit::script", message = %msg, "console.error");
        })?,
    )?;

    ctx.globals().set("console", console)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> DgkitResult<String> {
        evaluate_module(Path::new("schema.js"), source)
    }

    #[test]
    fn test_module_exports_string() {
        let schema = eval(r#"module.exports = "type A { id: ID! }";"#).unwrap();
        assert_eq!(schema, "type A { id: ID! }");
    }

    #[test]
    fn test_module_can_compute_schema() {
        let source = r#"
const types = ["A", "B"].map(t => `type ${t} { id: ID! }`);
console.log("building schema");
module.exports = types.join("\n");
"#;
        assert_eq!(eval(source).unwrap(), "type A { id: ID! }\ntype B { id: ID! }");
    }

    #[test]
    fn test_console_accepts_any_values() {
        let source = r#"
console.log(1, { a: 1 });
console.warn(undefined, [1, "two"], null);
console.error(function named() {}, Symbol("s"));
console.log();
module.exports = "type A { id: ID! }";
"#;
        assert_eq!(eval(source).unwrap(), "type A { id: ID! }");
    }

    #[test]
    fn test_render_console_values() {
        let runtime = Runtime::new().unwrap();
        let context = Context::full(&runtime).unwrap();
        context.with(|ctx| {
            let values: Vec<Value<'_>> = ctx
                .eval(r#"["text", 3, { a: 1 }, [true, null], undefined]"#)
                .unwrap();
            assert_eq!(render_args(&values), r#"text 3 {"a":1} [true,null] undefined"#);
        });
    }

    #[test]
    fn test_non_string_export_is_rejected() {
        let err = eval("module.exports = { schema: 1 };").unwrap_err();
        match err {
            DgkitError::Script { message, .. } => {
                assert!(message.contains("must be a string"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_thrown_error_is_reported() {
        let err = eval(r#"throw new Error("no schema today");"#).unwrap_err();
        match err {
            DgkitError::Script { message, .. } => assert!(message.contains("no schema today")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_syntax_error_is_reported() {
        assert!(matches!(
            eval("module.exports = ;"),
            Err(DgkitError::Script { .. })
        ));
    }

    #[test]
    fn test_state_does_not_leak_between_evaluations() {
        eval(r#"globalThis.leaked = "x"; module.exports = "";"#).unwrap();
        let schema = eval(r#"module.exports = typeof leaked;"#).unwrap();
        assert_eq!(schema, "undefined");
    }
}
