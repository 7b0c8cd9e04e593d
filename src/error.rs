use ash::vk;
use ash::vk::CStrTooLargeForStaticArray;
use std::backtrace::Backtrace;
use std::fmt::{Display, Formatter};

#[derive(Debug, thiserror::Error)]
pub enum Variant {
    #[error("static string too large: {0:?}")]
    CStrTooLargeForStaticArray(CStrTooLargeForStaticArray),
    #[error("next layer failed with {0}")]
    Vulkan(vk::Result),
    #[error("no layer link info in create info chain")]
    NoLayerLink,
    #[error("next layer does not provide an entry point")]
    EntryPointNotFound,
}

pub struct Error {
    message: Option<String>,
    variant: Variant,
    backtrace: Backtrace,
}

impl Error {
    pub fn new(message: Option<String>, variant: Variant) -> Self {
        Self {
            message,
            variant,
            backtrace: Backtrace::capture(),
        }
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// The code reported to the layer above.
    pub fn vk_result(&self) -> vk::Result {
        match self.variant {
            Variant::Vulkan(result) => result,
            Variant::CStrTooLargeForStaticArray(_) | Variant::NoLayerLink | Variant::EntryPointNotFound => {
                vk::Result::ERROR_INITIALIZATION_FAILED
            }
        }
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => writeln!(f, "{}: {:?}", msg, self.variant)?,
            None => writeln!(f, "{:?}", self.variant)?,
        }

        writeln!(f, "Backtrace:\n{}", self.backtrace)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.variant)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", msg, self.variant),
            None => write!(f, "{}", self.variant),
        }
    }
}

impl From<vk::Result> for Error {
    fn from(e: vk::Result) -> Self {
        Self {
            message: None,
            variant: Variant::Vulkan(e),
            backtrace: Backtrace::capture(),
        }
    }
}

impl From<CStrTooLargeForStaticArray> for Error {
    fn from(e: CStrTooLargeForStaticArray) -> Self {
        Self {
            message: None,
            variant: Variant::CStrTooLargeForStaticArray(e),
            backtrace: Backtrace::capture(),
        }
    }
}

impl From<Error> for vk::Result {
    fn from(e: Error) -> Self {
        e.vk_result()
    }
}

/// Collapses a handler result into the status code returned across the C boundary.
pub(crate) fn status(result: Result<(), Error>) -> vk::Result {
    match result {
        Ok(()) => vk::Result::SUCCESS,
        Err(e) => {
            log::warn!("{e}");
            e.vk_result()
        }
    }
}

#[macro_export]
macro_rules! error {
    ($variant:expr, $($args:tt)*) => {
        {
            let message = format!($($args)*);
            $crate::Error::new(Some(message), $variant)
        }
    };
    ($variant:expr) => {
        {
            $crate::Error::new(None, $variant)
        }
    };
}
