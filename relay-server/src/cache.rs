//! HTTP cache validation for stored images.

use axum::http::{
    header::{CACHE_CONTROL, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED},
    HeaderMap, HeaderValue,
};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use relay_blob::ObjectHead;

/// Keys never change content, so clients may keep them for a year
pub const CACHE_CONTROL_VALUE: &str = "public, max-age=31536000";

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Validator headers for `head`. Values the store left out are skipped.
pub fn validator_headers(head: &ObjectHead) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));

    if let Some(etag) = head.etag.as_deref().and_then(|e| HeaderValue::from_str(e).ok()) {
        headers.insert(ETAG, etag);
    }
    if let Some(modified) = head.last_modified {
        if let Ok(value) = HeaderValue::from_str(&format_http_date(modified)) {
            headers.insert(LAST_MODIFIED, value);
        }
    }
    headers
}

/// True when the request's validators show the client already has `head`.
///
/// `If-None-Match` must equal the stored ETag exactly. `If-Modified-Since`
/// matches when the object was not modified after it, compared in whole
/// seconds since HTTP dates carry no fraction.
pub fn is_not_modified(request: &HeaderMap, head: &ObjectHead) -> bool {
    let if_none_match = request
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    if let (Some(candidate), Some(etag)) = (if_none_match, head.etag.as_deref()) {
        if candidate == etag {
            return true;
        }
    }

    let since = request
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_http_date);
    match (since, head.last_modified) {
        (Some(since), Some(modified)) => modified.trunc_subsecs(0) <= since,
        _ => false,
    }
}
