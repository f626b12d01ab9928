//! URL and query-string utilities

use std::collections::HashMap;
use url::{form_urlencoded, Url};

/// Parse a query-string payload into decoded key/value pairs.
///
/// Repeated keys keep their first value.
pub fn parse_query_string(payload: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in form_urlencoded::parse(payload.trim_start_matches('?').as_bytes()) {
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

/// Get the first value of a query parameter
pub fn get_query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Set a query parameter, replacing the first occurrence in place and dropping the rest.
/// Appends when the key is absent.
pub fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k != key {
                return Some((k.into_owned(), v.into_owned()));
            }
            if replaced {
                None
            } else {
                replaced = true;
                Some((k.into_owned(), value.to_string()))
            }
        })
        .collect();

    let mut serializer = url.query_pairs_mut();
    serializer.clear().extend_pairs(pairs.iter());
    if !replaced {
        serializer.append_pair(key, value);
    }
}
