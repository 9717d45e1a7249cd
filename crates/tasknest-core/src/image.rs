/// Host marker identifying URLs served by the image CDN.
pub const HOSTED_IMAGE_MARKER: &str = "cloudinary.com";

const UPLOAD_SEGMENT: &str = "/upload/";

/// True for `data:` URLs produced by the inline fallback.
#[must_use]
pub fn is_inline(url: &str) -> bool {
    url.starts_with("data:")
}

/// True for URLs served by the image CDN.
#[must_use]
pub fn is_hosted(url: &str) -> bool {
    !is_inline(url) && url.contains(HOSTED_IMAGE_MARKER)
}

/// URL of a `width`×`height` fill-cropped rendition of `url`.
///
/// Inline images and foreign URLs cannot be transformed and are returned unchanged.
#[must_use]
pub fn resized_url(url: &str, width: u32, height: u32) -> String {
    if !is_hosted(url) {
        return url.to_owned();
    }
    url.replacen(
        UPLOAD_SEGMENT,
        &format!("{UPLOAD_SEGMENT}c_fill,w_{width},h_{height}/"),
        1,
    )
}
