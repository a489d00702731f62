//! Runtime vendor detection from the dump preamble

use crate::domain::JvmVendor;

const OPENJDK_MARKERS: &[&str] = &["OpenJDK", "HotSpot", "Java HotSpot"];

const IBM_MARKERS: &[&str] = &["IBM J9", "Eclipse OpenJ9", "OpenJ9", "IBM Semeru", "(J9 "];

/// Guess the runtime family from the text preceding the first stanza.
#[must_use]
pub fn detect_vendor(preamble: &str) -> JvmVendor {
    // IBM first: Semeru banners also mention "OpenJDK" in some builds
    if IBM_MARKERS.iter().any(|m| preamble.contains(m)) {
        JvmVendor::Ibm
    } else if OPENJDK_MARKERS.iter().any(|m| preamble.contains(m)) {
        JvmVendor::OpenJdk
    } else {
        JvmVendor::Unknown
    }
}
