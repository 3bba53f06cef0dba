//! Runtime dispatcher for Ferry.
//!
//! [`Ferry`] probes the environment once and then either runs the serverless
//! host event loop ([`lambda`]) or a standalone HTTP listener ([`server`]),
//! with the application mounted under the configured prefix in both cases.
//!
//! | Mode | Detected when | Runs |
//! |------|---------------|------|
//! | serverless handler | managed runtime and `_HANDLER` set | host event loop |
//! | serverless extension | managed runtime, no `_HANDLER` | listener |
//! | standalone | otherwise | listener |

mod dispatcher;
pub mod lambda;
pub mod probe;
pub mod proxy_protocol;
pub mod server;
pub mod shutdown;

pub use dispatcher::{Ferry, TermHandler};
pub use lambda::{Invoker, Outcome, TraceIds, parse_env_bool, resolve_streaming};
pub use server::ServeOptions;
