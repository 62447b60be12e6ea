//! Query-string manipulation for the upstream endpoints.

use kolejka_core::{Error, Result};
use url::form_urlencoded;

/// Encode `params` and append them to `url`'s query string.
///
/// New pairs land immediately before any `#fragment`, joined to existing
/// parameters with `&`; the leading `?` is added only when absent. The
/// URL itself is taken as-is — it does not have to be absolute.
pub fn append_parameters(url: &str, params: &[(&str, &str)]) -> Result<String> {
  if url.is_empty() {
    return Err(Error::InvalidUrl("no URL provided".into()));
  }

  let encoded = form_urlencoded::Serializer::new(String::new())
    .extend_pairs(params)
    .finish();
  if encoded.is_empty() {
    return Ok(url.to_owned());
  }

  let (body, fragment) = match url.find('#') {
    Some(pos) => url.split_at(pos),
    None => (url, ""),
  };

  let joined = match body.find('?') {
    None => format!("{body}?{encoded}"),
    // A trailing `?` already separates the (empty) query string.
    Some(pos) if body[pos + 1..].is_empty() => format!("{body}{encoded}"),
    Some(_) => format!("{body}&{encoded}"),
  };

  Ok(format!("{joined}{fragment}"))
}
