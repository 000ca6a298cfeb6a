/// Error types for package operations
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The per-part limit was configured above the whole-archive limit.
    #[error(
        "the value of unzip_size_limit should be greater than or equal to unzip_xml_size_limit"
    )]
    UnzipSizeLimitOrder,

    #[error("password length must be at most {max} characters")]
    PasswordLengthInvalid { max: usize },

    /// The running total of declared uncompressed sizes passed the limit.
    #[error("unzip size exceeds the {limit} bytes limit")]
    UnzipSizeLimit { limit: u64 },

    #[error("slide {id} does not exist")]
    SlideNotExist { id: u32 },

    #[error("slide name cannot be blank")]
    SlideNameBlank,

    #[error("unsupported presentation file extension: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("no path defined for file, consider Package::write_to or Package::write_to_buffer")]
    NoSavePath,

    #[error("file path length exceeds maximum limit of {max} characters")]
    MaxFilePathLength { max: usize },

    #[error("invalid pack URI: {0}")]
    InvalidPackUri(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(err: std::str::Utf8Error) -> Self {
        Error::Xml(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
