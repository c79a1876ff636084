//! Percent-encoding strategies applied to URL parameter values.

use log::trace;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Escapes everything a component encoder escapes: all characters except
/// ASCII alphanumerics and `- _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The component set minus the sub-delimiters that route patterns give
/// meaning to (`+ : ' ! , ; *`), which survive encoding untouched.
const DEFAULT: &AsciiSet = &URI_COMPONENT
    .remove(b'+')
    .remove(b':')
    .remove(b',')
    .remove(b';');

/// Escapes what a whole-URI encoder escapes, leaving reserved characters
/// (`; , / ? : @ & = + $ #`) in place.
const URI: &AsciiSet = &DEFAULT
    .remove(b'/')
    .remove(b'?')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'$')
    .remove(b'#');

/// Named percent-encoding strategies for URL parameter values.
///
/// Each strategy is a matched pair: the encoder applied while building a
/// path and the decoder applied to captured values while matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParamEncoding {
    /// Component encoding that preserves the sub-delimiters
    /// (`+ : ' ! , ; *`) recognised by the pattern grammar.
    Default,
    /// Whole-URI encoding; reserved characters pass through untouched.
    Uri,
    /// Component encoding; reserved characters are escaped.
    UriComponent,
    /// Identity in both directions.
    None,
    /// Compatibility alias of [`ParamEncoding::Default`]. Decoding is
    /// lenient: input containing invalid percent triples is passed through
    /// verbatim instead of rejecting the match.
    Legacy,
}

impl Default for ParamEncoding {
    fn default() -> Self {
        ParamEncoding::Default
    }
}

impl ParamEncoding {
    /// Encodes a single parameter value.
    pub fn encode(self, raw: &str) -> String {
        match self {
            ParamEncoding::Default | ParamEncoding::Legacy => {
                utf8_percent_encode(raw, DEFAULT).to_string()
            }
            ParamEncoding::Uri => utf8_percent_encode(raw, URI).to_string(),
            ParamEncoding::UriComponent => utf8_percent_encode(raw, URI_COMPONENT).to_string(),
            ParamEncoding::None => raw.to_owned(),
        }
    }

    /// Encodes a splat value segment by segment, so that the `/` structure
    /// of the value survives encoding.
    pub fn encode_splat(self, raw: &str) -> String {
        raw.split('/')
            .map(|segment| self.encode(segment))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Decodes a captured value. Returns `None` when the input is not
    /// decodable under this strategy (invalid percent triples, or percent
    /// data that is not valid UTF-8).
    pub fn decode(self, raw: &str) -> Option<String> {
        match self {
            ParamEncoding::None => Some(raw.to_owned()),
            ParamEncoding::Legacy if !has_valid_percent_triples(raw) => {
                trace!(" lenient decode, passing through: {}", raw);
                Some(raw.to_owned())
            }
            _ => {
                if !has_valid_percent_triples(raw) {
                    trace!(" percent decode: invalid triple, src: {}", raw);
                    return None;
                }
                match percent_decode_str(raw).decode_utf8() {
                    Ok(decoded) => Some(decoded.into_owned()),
                    Err(_) => {
                        trace!(" percent decode: invalid utf-8, src: {}", raw);
                        None
                    }
                }
            }
        }
    }
}

/// True when every `%` in `raw` is followed by exactly two hex digits.
fn has_valid_percent_triples(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len()
                || !bytes[i + 1].is_ascii_hexdigit()
                || !bytes[i + 2].is_ascii_hexdigit()
            {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}

/// A parameter value that has been successfully decoded under a strategy.
///
/// Carrying the value in this wrapper gives a compile-time guarantee that
/// the decode happened in places where it is assumed to have happened.
#[derive(Clone, PartialEq, Debug)]
pub struct PercentDecoded {
    val: String,
}

impl PercentDecoded {
    /// Attempts to decode `raw` under `encoding`, yielding proof of the
    /// decode on success.
    pub(crate) fn new(raw: &str, encoding: ParamEncoding) -> Option<Self> {
        encoding.decode(raw).map(|val| {
            trace!(" percent decode: {}, src: {}", val, raw);
            PercentDecoded { val }
        })
    }

    pub(crate) fn into_inner(self) -> String {
        self.val
    }
}

impl AsRef<str> for PercentDecoded {
    fn as_ref(&self) -> &str {
        &self.val
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preserves_sub_delimiters() {
        assert_eq!(
            ParamEncoding::Default.encode("a+b:c'd!e,f;g*h"),
            "a+b:c'd!e,f;g*h"
        );
        assert_eq!(ParamEncoding::Default.encode("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn uri_component_escapes_reserved() {
        assert_eq!(ParamEncoding::UriComponent.encode("a/b?c"), "a%2Fb%3Fc");
        assert_eq!(ParamEncoding::UriComponent.encode("a-b_c.d"), "a-b_c.d");
    }

    #[test]
    fn uri_leaves_reserved_untouched() {
        assert_eq!(ParamEncoding::Uri.encode("/a?b=c&d"), "/a?b=c&d");
        assert_eq!(ParamEncoding::Uri.encode("a b"), "a%20b");
    }

    #[test]
    fn splat_values_encode_per_segment() {
        assert_eq!(
            ParamEncoding::UriComponent.encode_splat("a b/c d"),
            "a%20b/c%20d"
        );
    }

    #[test]
    fn decode_round_trip() {
        let decoded = PercentDecoded::new("%41%20%42", ParamEncoding::Default).unwrap();
        assert_eq!("A B", decoded.as_ref());
    }

    #[test]
    fn invalid_triple_rejected() {
        assert!(ParamEncoding::Default.decode("%2").is_none());
        assert!(ParamEncoding::Default.decode("abc%zz").is_none());
    }

    #[test]
    fn legacy_passes_invalid_input_through() {
        assert_eq!(ParamEncoding::Legacy.decode("%zz").unwrap(), "%zz");
        assert_eq!(ParamEncoding::Legacy.decode("%41").unwrap(), "A");
    }

    #[test]
    fn none_is_identity() {
        assert_eq!(ParamEncoding::None.encode("a/b%20"), "a/b%20");
        assert_eq!(ParamEncoding::None.decode("a/b%20").unwrap(), "a/b%20");
    }
}
