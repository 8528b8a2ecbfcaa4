//! AMD module emission.
//!
//! Wrapped output declares its module identifier up front and receives only
//! the runtime's own `require` hook, so bare `require(...)` calls inside the
//! source keep working under the loader:
//!
//! ```text
//! define('name', ['require'], function(require) {
//!   var module = { exports: {} };
//!   var exports = module.exports;
//!   /* original source */
//!   return module.exports;
//! });
//! ```
//!
//! The callback's return value is the module's `module.exports`; a loader
//! with CommonJS interop surfaces that value as the `default` export and
//! spreads any named properties.

/// Wrap CommonJS `source` as an AMD module declaring `name`.
pub fn wrap_module(name: &str, source: &str) -> String {
    format!(
        "define('{}', ['require'], function(require) {{\n\
         var module = {{ exports: {{}} }};\n\
         var exports = module.exports;\n\
         {}\n\
         return module.exports;\n\
         }});\n",
        escape_identifier(name),
        source
    )
}

/// Escape a module identifier for embedding in a single-quoted JS string.
fn escape_identifier(name: &str) -> String {
    name.replace('\\', "\\\\").replace('\'', "\\'")
}
