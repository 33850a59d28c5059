//! Exit-code classification for diagnostics.

/// Exit code the downloader uses when the site blocks automated access.
pub const BLOCKED_EXIT_CODE: i32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Success,
    GenericFailure,
    DependencyOrArgs,
    Interrupted,
    InvalidArgument,
    Blocked,
    Unknown(i32),
}

impl ExitClass {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ExitClass::Success,
            1 => ExitClass::GenericFailure,
            2 => ExitClass::DependencyOrArgs,
            101 => ExitClass::Interrupted,
            128 => ExitClass::InvalidArgument,
            BLOCKED_EXIT_CODE => ExitClass::Blocked,
            other => ExitClass::Unknown(other),
        }
    }

    pub fn describe(self) -> String {
        match self {
            ExitClass::Success => "success".to_string(),
            ExitClass::GenericFailure => {
                "generic error (network, unavailable video, or invalid URL)".to_string()
            }
            ExitClass::DependencyOrArgs => {
                "missing dependency or invalid command line argument".to_string()
            }
            ExitClass::Interrupted => "interrupted by user".to_string(),
            ExitClass::InvalidArgument => "invalid argument".to_string(),
            ExitClass::Blocked => "request blocked by anti-automation measures".to_string(),
            ExitClass::Unknown(code) => format!("unknown exit code {code}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes() {
        assert_eq!(ExitClass::from_code(0), ExitClass::Success);
        assert_eq!(ExitClass::from_code(1), ExitClass::GenericFailure);
        assert_eq!(ExitClass::from_code(2), ExitClass::DependencyOrArgs);
        assert_eq!(ExitClass::from_code(101), ExitClass::Interrupted);
        assert_eq!(ExitClass::from_code(128), ExitClass::InvalidArgument);
        assert_eq!(ExitClass::from_code(255), ExitClass::Blocked);
        assert_eq!(ExitClass::from_code(7), ExitClass::Unknown(7));
        assert_eq!(ExitClass::Unknown(7).describe(), "unknown exit code 7");
    }
}
