//! Environment probing.
//!
//! Every probe has a `*_with` twin taking an environment lookup, so the
//! decision logic can be exercised without touching the process environment.

use ferry_core::RuntimeMode;

/// Env var identifying the managed runtime.
pub const EXECUTION_ENV: &str = "AWS_EXECUTION_ENV";
/// Env var holding the runtime API endpoint.
pub const RUNTIME_API_ENV: &str = "AWS_LAMBDA_RUNTIME_API";
/// Env var naming the function handler.
pub const HANDLER_ENV: &str = "_HANDLER";

const MANAGED_RUNTIME_PREFIX: &str = "AWS_Lambda";

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Whether the process runs inside the managed serverless runtime.
#[must_use]
pub fn on_managed_runtime() -> bool {
    on_managed_runtime_with(process_env)
}

/// [`on_managed_runtime`] over an arbitrary lookup.
pub fn on_managed_runtime_with(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(EXECUTION_ENV).is_some_and(|v| v.starts_with(MANAGED_RUNTIME_PREFIX))
        || lookup(RUNTIME_API_ENV).is_some_and(|v| !v.is_empty())
}

/// Whether the process is the function handler.
#[must_use]
pub fn acting_as_handler() -> bool {
    acting_as_handler_with(process_env)
}

/// [`acting_as_handler`] over an arbitrary lookup.
pub fn acting_as_handler_with(lookup: impl Fn(&str) -> Option<String>) -> bool {
    on_managed_runtime_with(&lookup) && lookup(HANDLER_ENV).is_some_and(|v| !v.is_empty())
}

/// Whether the process runs inside the managed runtime but is not the handler.
#[must_use]
pub fn acting_as_extension() -> bool {
    acting_as_extension_with(process_env)
}

/// [`acting_as_extension`] over an arbitrary lookup.
pub fn acting_as_extension_with(lookup: impl Fn(&str) -> Option<String>) -> bool {
    on_managed_runtime_with(&lookup) && !lookup(HANDLER_ENV).is_some_and(|v| !v.is_empty())
}

/// Runtime mode of this process.
#[must_use]
pub fn detect_mode() -> RuntimeMode {
    detect_mode_with(process_env)
}

/// [`detect_mode`] over an arbitrary lookup.
pub fn detect_mode_with(lookup: impl Fn(&str) -> Option<String>) -> RuntimeMode {
    if acting_as_handler_with(&lookup) {
        RuntimeMode::ServerlessHandler
    } else if acting_as_extension_with(&lookup) {
        RuntimeMode::ServerlessExtension
    } else {
        RuntimeMode::StandaloneServer
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_should_detect_standalone_without_runtime_vars() {
        assert!(!on_managed_runtime_with(env(&[])));
        assert_eq!(detect_mode_with(env(&[])), RuntimeMode::StandaloneServer);
    }

    #[test]
    fn test_should_detect_handler_mode() {
        let lookup = env(&[
            (EXECUTION_ENV, "AWS_Lambda_provided.al2023"),
            (HANDLER_ENV, "bootstrap"),
        ]);
        assert!(on_managed_runtime_with(&lookup));
        assert!(acting_as_handler_with(&lookup));
        assert!(!acting_as_extension_with(&lookup));
        assert_eq!(detect_mode_with(&lookup), RuntimeMode::ServerlessHandler);
    }

    #[test]
    fn test_should_detect_extension_mode() {
        let lookup = env(&[(RUNTIME_API_ENV, "127.0.0.1:9001")]);
        assert!(on_managed_runtime_with(&lookup));
        assert!(acting_as_extension_with(&lookup));
        assert_eq!(detect_mode_with(&lookup), RuntimeMode::ServerlessExtension);
    }

    #[test]
    fn test_should_ignore_foreign_execution_env() {
        let lookup = env(&[(EXECUTION_ENV, "AWS_ECS_FARGATE"), (HANDLER_ENV, "x")]);
        assert!(!on_managed_runtime_with(&lookup));
        assert_eq!(detect_mode_with(&lookup), RuntimeMode::StandaloneServer);
    }

    #[test]
    fn test_should_treat_empty_handler_as_extension() {
        let lookup = env(&[(RUNTIME_API_ENV, "127.0.0.1:9001"), (HANDLER_ENV, "")]);
        assert_eq!(detect_mode_with(&lookup), RuntimeMode::ServerlessExtension);
    }
}
