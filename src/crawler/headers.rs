use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, REFERER,
    USER_AGENT,
};

/// Build browser-like headers for the Kobo blog
///
/// The blog sits behind a CDN that answers bare clients with 403, so requests
/// look like a zh-TW desktop browser navigating from the blog index. Values
/// that are not valid header text are left out.
///
/// # Examples
///
/// ```
/// use kobo99::crawler::headers::build_blog_headers;
///
/// let headers = build_blog_headers(
///     "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
///     "https://www.kobo.com/zh/blog",
/// );
/// assert!(headers.contains_key("sec-fetch-mode"));
/// ```
pub fn build_blog_headers(user_agent: &str, referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    if let Ok(value) = HeaderValue::from_str(user_agent) {
        headers.insert(USER_AGENT, value);
    }
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

    // Sec-Fetch headers for a top-level navigation
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );

    headers
}
