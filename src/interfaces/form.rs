//! `application/x-www-form-urlencoded` glue between HTTP bodies and
//! [`ParameterSet`]s.

use crate::domain::params::ParameterSet;
use url::Url;
use url::form_urlencoded;

/// Decodes a notification body or a return query string.
///
/// A leading `?` is ignored. When a key repeats, the last value wins.
pub fn parse_form(input: &str) -> ParameterSet {
    let input = input.trim().trim_start_matches('?');
    form_urlencoded::parse(input.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Encodes parameters in key order, nested values as compact JSON.
pub fn encode_query(params: &ParameterSet) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.to_pairs())
        .finish()
}

/// Gateway URL carrying `params` as its query, for a GET redirect.
pub fn redirect_url(gateway: &Url, params: &ParameterSet) -> Url {
    let mut url = gateway.clone();
    url.query_pairs_mut().extend_pairs(params.to_pairs());
    url
}
