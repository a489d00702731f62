//! Frame origin classification for distinguishing application code from
//! the JDK and frameworks.
//!
//! A blocked thread parked deep inside `java.util.concurrent` is only
//! interesting once you find the first frame that belongs to the
//! application. This module provides the heuristics for that split.
//!
//! # Classification Strategy
//!
//! 1. **Frame normalisation** - strip `app//` class-loader and
//!    `java.base@17/` module prefixes so only the qualified method remains
//! 2. **Package prefixes** - `java.`, `jdk.`, `sun.` → JDK;
//!    `org.eclipse.jetty.`, `org.springframework.` → framework
//! 3. **Application package** - when the caller names one, only frames in
//!    that package are application code; other non-JDK frames are treated
//!    as third-party libraries

use crate::domain::StackFrame;
use serde::{Deserialize, Serialize};

/// Origin of a stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameOrigin {
    /// Code that is neither JDK nor a known framework
    Application,
    /// `java.*`, `jdk.*`, `sun.*` and friends
    Jdk,
    /// Known server/runtime frameworks and third-party libraries
    Framework,
    /// Empty or unreadable frame text
    #[default]
    Unknown,
}

impl FrameOrigin {
    #[must_use]
    pub fn is_application(&self) -> bool {
        matches!(self, FrameOrigin::Application)
    }
}

/// Thread category derived from its whole stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadCategory {
    /// At least one application frame
    Application,
    /// Framework frames but no application frames
    Framework,
    /// Only JDK frames
    Jdk,
    /// No frames at all
    Unknown,
}

// =============================================================================
// CLASSIFICATION TABLES
// =============================================================================

const JDK_PREFIXES: &[&str] = &["java.", "javax.", "jdk.", "sun.", "com.sun.", "jakarta."];

const FRAMEWORK_PREFIXES: &[&str] = &[
    "org.eclipse.jetty.",
    "spark.",
    "org.springframework.",
    "io.netty.",
    "org.apache.catalina.",
    "org.apache.tomcat.",
    "org.apache.coyote.",
    "org.apache.kafka.",
    "org.apache.commons.",
    "io.undertow.",
    "io.grpc.",
    "io.vertx.",
    "akka.",
    "kotlinx.coroutines.",
    "kotlin.",
    "scala.",
    "com.zaxxer.hikari.",
    "org.hibernate.",
];

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify one frame by its package prefix.
///
/// # Examples
///
/// ```
/// use stallwatch::classification::{classify_frame, FrameOrigin};
///
/// assert_eq!(classify_frame("java.lang.Object.wait(Native Method)"), FrameOrigin::Jdk);
/// assert_eq!(classify_frame("app//org.eclipse.jetty.server.Server.join(Server.java:551)"), FrameOrigin::Framework);
/// assert_eq!(classify_frame("com.example.Foo.bar(Foo.java:10)"), FrameOrigin::Application);
/// ```
#[must_use]
pub fn classify_frame(frame: &str) -> FrameOrigin {
    let method = qualified_method(frame);
    if method.is_empty() {
        return FrameOrigin::Unknown;
    }

    if has_prefix(method, JDK_PREFIXES) {
        FrameOrigin::Jdk
    } else if has_prefix(method, FRAMEWORK_PREFIXES) {
        FrameOrigin::Framework
    } else {
        FrameOrigin::Application
    }
}

/// Whether a frame belongs to the given application package.
///
/// Without a package there is nothing to match against, so nothing is
/// application code.
#[must_use]
pub fn is_application_frame(frame: &str, app_package: Option<&str>) -> bool {
    let Some(package) = app_package else {
        return false;
    };
    let package = package.trim_end_matches('.');
    let method = qualified_method(frame);

    method.strip_prefix(package).is_some_and(|rest| rest.starts_with('.'))
}

/// Classify a thread from its stack.
///
/// With an application package, frames outside it that would otherwise be
/// application code count as framework (third-party) frames.
#[must_use]
pub fn classify_thread(stack: &[StackFrame], app_package: Option<&str>) -> ThreadCategory {
    if stack.is_empty() {
        return ThreadCategory::Unknown;
    }

    let mut has_framework_frame = false;
    for frame in stack {
        let origin = match (classify_frame(frame.as_str()), app_package) {
            (FrameOrigin::Application, Some(_)) if !is_application_frame(frame.as_str(), app_package) => {
                FrameOrigin::Framework
            }
            (origin, _) => origin,
        };

        match origin {
            FrameOrigin::Application => return ThreadCategory::Application,
            FrameOrigin::Framework => has_framework_frame = true,
            FrameOrigin::Jdk | FrameOrigin::Unknown => {}
        }
    }

    if has_framework_frame {
        ThreadCategory::Framework
    } else {
        ThreadCategory::Jdk
    }
}

/// First frame belonging to the application, the usual starting point for triage.
#[must_use]
pub fn first_application_frame<'a>(
    stack: &'a [StackFrame],
    app_package: Option<&str>,
) -> Option<&'a StackFrame> {
    stack.iter().find(|frame| match app_package {
        Some(_) => is_application_frame(frame.as_str(), app_package),
        None => classify_frame(frame.as_str()).is_application(),
    })
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// `app//com.example.Foo.bar(Foo.java:10)` -> `com.example.Foo.bar`
/// `java.base@11.0.16/java.lang.Object.wait(Native Method)` -> `java.lang.Object.wait`
fn qualified_method(frame: &str) -> &str {
    let frame = frame.trim();
    let frame = frame.strip_prefix("at ").unwrap_or(frame);
    let method = frame.split('(').next().unwrap_or(frame);
    method.rsplit('/').next().unwrap_or(method).trim()
}

fn has_prefix(method: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| method.starts_with(p))
}
