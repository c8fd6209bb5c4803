use std::fmt::{Debug, Display};

/// Broad category of an [`IconError`], used by the pipeline to decide
/// whether a failure aborts the run or only skips one candidate.
#[derive(strum::IntoStaticStr, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The screenshot is unreadable, corrupt or has zero width/height
    InvalidInput,
    /// A single candidate is too small to be cut with its mask
    UndersizedCandidate,
    /// A mask asset is missing, unreadable or empty
    MissingMask,
    /// The configuration file or a flag has an invalid value
    InvalidConfig,
    /// Writing an output file failed
    Io,
}

#[derive(Clone, PartialEq)]
pub struct IconError {
    pub kind: ErrorKind,
    pub message: String,
}

impl IconError {
    /// Only an undersized candidate lets the rest of the batch continue.
    pub fn is_fatal(&self) -> bool {
        self.kind != ErrorKind::UndersizedCandidate
    }
}

impl Display for IconError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Debug for IconError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for IconError {}

#[macro_export]
macro_rules! icon_err {
    ($kind:expr, $($arg:tt)+) => {
        $crate::error::IconError {
            kind: $kind,
            message: format!(
                "iconsnip: {} @ {}:{}:{}",
                format!($($arg)+),
                file!(),
                line!(),
                column!()
            ),
        }
    };
}

#[macro_export]
macro_rules! icon_try {
    ($kind:expr, $expr:expr $(,)?) => {
        match $expr {
            std::result::Result::Ok(val) => val,
            std::result::Result::Err(err) => {
                return std::result::Result::Err($crate::icon_err!($kind, "{}", err));
            }
        }
    };
}
