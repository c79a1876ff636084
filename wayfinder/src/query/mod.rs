//! Query-string parsing and building behind an injectable codec.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::params::{ParamValue, Params};

/// Escape set for query components: everything except unreserved chars.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// How repeated values are rendered into a query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    /// `a=1&a=2`
    Repeat,
    /// `a[]=1&a[]=2`
    Brackets,
    /// `a[0]=1&a[1]=2`
    Index,
    /// `a=1,2`
    Comma,
}

impl Default for ArrayFormat {
    fn default() -> Self {
        ArrayFormat::Repeat
    }
}

/// How a key without a value is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullFormat {
    /// Render the bare key (`?flag`).
    BareKey,
    /// Omit the key entirely.
    Hidden,
}

impl Default for NullFormat {
    fn default() -> Self {
        NullFormat::BareKey
    }
}

/// Options handed through to the codec unchanged; the router core never
/// interprets them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamsOptions {
    /// Rendering of repeated values.
    pub array_format: ArrayFormat,
    /// Rendering of valueless keys.
    pub null_format: NullFormat,
}

/// The pair of pure functions the router core requires for query strings.
///
/// `parse` accepts either a bare query string or a whole URL; repeated
/// names produce [`ParamValue::List`], bare names produce
/// [`ParamValue::Null`]. `build` is the inverse and never emits a leading
/// `?`.
pub trait QueryCodec {
    /// Parses a query string (or URL) into a parameter map.
    fn parse(&self, query_or_url: &str, options: &QueryParamsOptions) -> Params;

    /// Builds a query string from a parameter map, without a leading `?`.
    fn build(&self, params: &Params, options: &QueryParamsOptions) -> String;
}

/// The bundled codec: form-urlencoded keys and values, `+` accepted as a
/// space on the way in, `%20` produced on the way out.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormUrlCodec;

impl FormUrlCodec {
    fn decode(raw: &str) -> Option<String> {
        percent_decode_str(&raw.replace('+', " "))
            .decode_utf8()
            .ok()
            .map(|decoded| decoded.into_owned())
    }

    fn encode(raw: &str) -> String {
        utf8_percent_encode(raw, QUERY).to_string()
    }

    /// Strips an array suffix (`[]` or `[0]`) from a parsed key.
    fn base_key(key: &str) -> (&str, bool) {
        if let Some(open) = key.rfind('[') {
            if key.ends_with(']') {
                let inner = &key[open + 1..key.len() - 1];
                if inner.is_empty() || inner.bytes().all(|b| b.is_ascii_digit()) {
                    return (&key[..open], true);
                }
            }
        }
        (key, false)
    }
}

impl QueryCodec for FormUrlCodec {
    fn parse(&self, query_or_url: &str, options: &QueryParamsOptions) -> Params {
        let query = match query_or_url.find('?') {
            Some(idx) => &query_or_url[idx + 1..],
            None => query_or_url,
        };

        let mut params = Params::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = match pair.find('=') {
                Some(idx) => (&pair[..idx], Some(&pair[idx + 1..])),
                None => (pair, None),
            };
            let decoded_key = match Self::decode(raw_key) {
                Some(key) => key,
                None => continue,
            };
            let (key, is_array) = Self::base_key(&decoded_key);
            let value = match raw_value {
                None => ParamValue::Null,
                Some(raw) => match Self::decode(raw) {
                    Some(decoded) => {
                        if options.array_format == ArrayFormat::Comma && decoded.contains(',') {
                            ParamValue::List(
                                decoded.split(',').map(str::to_owned).collect(),
                            )
                        } else {
                            ParamValue::Single(decoded)
                        }
                    }
                    None => continue,
                },
            };

            match params.remove(key) {
                None => {
                    if is_array {
                        match value {
                            ParamValue::Single(s) => {
                                params.insert(key, ParamValue::List(vec![s]))
                            }
                            other => params.insert(key, other),
                        }
                    } else {
                        params.insert(key, value);
                    }
                }
                Some(existing) => {
                    let mut values: Vec<String> = match existing {
                        ParamValue::Single(s) => vec![s],
                        ParamValue::List(list) => list,
                        ParamValue::Null => vec![],
                    };
                    match value {
                        ParamValue::Single(s) => values.push(s),
                        ParamValue::List(mut list) => values.append(&mut list),
                        ParamValue::Null => {}
                    }
                    params.insert(key, ParamValue::List(values));
                }
            }
        }
        params
    }

    fn build(&self, params: &Params, options: &QueryParamsOptions) -> String {
        let mut parts: Vec<String> = Vec::new();
        for (key, value) in params.iter() {
            let encoded_key = Self::encode(key);
            match value {
                ParamValue::Single(s) => {
                    parts.push(format!("{}={}", encoded_key, Self::encode(s)));
                }
                ParamValue::Null => match options.null_format {
                    NullFormat::BareKey => parts.push(encoded_key),
                    NullFormat::Hidden => {}
                },
                ParamValue::List(values) => match options.array_format {
                    ArrayFormat::Repeat => {
                        for v in values {
                            parts.push(format!("{}={}", encoded_key, Self::encode(v)));
                        }
                    }
                    ArrayFormat::Brackets => {
                        for v in values {
                            parts.push(format!("{}[]={}", encoded_key, Self::encode(v)));
                        }
                    }
                    ArrayFormat::Index => {
                        for (i, v) in values.iter().enumerate() {
                            parts.push(format!("{}[{}]={}", encoded_key, i, Self::encode(v)));
                        }
                    }
                    ArrayFormat::Comma => {
                        let joined = values
                            .iter()
                            .map(|v| Self::encode(v))
                            .collect::<Vec<_>>()
                            .join(",");
                        parts.push(format!("{}={}", encoded_key, joined));
                    }
                },
            }
        }
        parts.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> Params {
        FormUrlCodec.parse(query, &QueryParamsOptions::default())
    }

    #[test]
    fn parses_scalars_arrays_and_bare_keys() {
        let params = parse("q=hi&tag=a&tag=b&flag");
        assert_eq!(params.get("q").unwrap().as_str(), Some("hi"));
        assert_eq!(
            params.get("tag").unwrap(),
            &ParamValue::List(vec!["a".to_owned(), "b".to_owned()])
        );
        assert_eq!(params.get("flag").unwrap(), &ParamValue::Null);
    }

    #[test]
    fn accepts_a_whole_url() {
        let params = parse("/search?q=hello%20world");
        assert_eq!(params.get("q").unwrap().as_str(), Some("hello world"));
    }

    #[test]
    fn plus_means_space_on_the_way_in() {
        let params = parse("q=a+b");
        assert_eq!(params.get("q").unwrap().as_str(), Some("a b"));
    }

    #[test]
    fn bracket_suffixes_collect_into_arrays() {
        let params = parse("tag[]=a&tag[]=b");
        assert_eq!(
            params.get("tag").unwrap(),
            &ParamValue::List(vec!["a".to_owned(), "b".to_owned()])
        );
    }

    #[test]
    fn builds_without_a_leading_question_mark() {
        let mut params = Params::new();
        params.insert("q", "hi there");
        params.insert("flag", ParamValue::Null);
        let built = FormUrlCodec.build(&params, &QueryParamsOptions::default());
        assert_eq!(built, "q=hi%20there&flag");
    }

    #[test]
    fn array_formats_round_trip() {
        let mut params = Params::new();
        params.insert(
            "tag",
            ParamValue::List(vec!["a".to_owned(), "b".to_owned()]),
        );

        let repeat = FormUrlCodec.build(&params, &QueryParamsOptions::default());
        assert_eq!(repeat, "tag=a&tag=b");

        let brackets = FormUrlCodec.build(
            &params,
            &QueryParamsOptions {
                array_format: ArrayFormat::Brackets,
                ..QueryParamsOptions::default()
            },
        );
        assert_eq!(brackets, "tag[]=a&tag[]=b");
    }

    #[test]
    fn hidden_null_format_omits_bare_keys() {
        let mut params = Params::new();
        params.insert("flag", ParamValue::Null);
        let built = FormUrlCodec.build(
            &params,
            &QueryParamsOptions {
                null_format: NullFormat::Hidden,
                ..QueryParamsOptions::default()
            },
        );
        assert_eq!(built, "");
    }
}
