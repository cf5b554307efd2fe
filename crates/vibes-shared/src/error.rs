use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Description is required")]
    MissingDescription,

    #[error("Description must be {max} characters or less")]
    DescriptionTooLong { max: usize },

    #[error("Display name is required")]
    MissingDisplayName,

    #[error("Please upload an image file (JPEG, PNG, etc.)")]
    NotAnImage,

    #[error("Image file is too large. Maximum size is {max} bytes.")]
    ThumbnailTooLarge { max: usize },

    #[error("Malformed thumbnail data: {0}")]
    MalformedThumbnail(String),
}

#[derive(Error, Debug)]
pub enum ColorError {
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("No opaque pixels to sample")]
    Transparent,
}
