use core::fmt;

/// The identification instruction has no implementation on the current architecture.
/// 
/// This is decided when the crate is compiled, so retrying the query will never succeed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct UnsupportedPlatform {
    arch: &'static str,
}

impl UnsupportedPlatform {
    pub const fn new(arch: &'static str) -> Self {
        Self { arch }
    }

    /// Name of the architecture the query was made on.
    pub const fn arch(&self) -> &'static str {
        self.arch
    }
}

impl fmt::Display for UnsupportedPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("CPUID instruction not available on the '{}' architecture", self.arch))
    }
}

impl std::error::Error for UnsupportedPlatform {}
