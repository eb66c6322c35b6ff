use url::Url;

/// Query-parameter prefix used by campaign tracking (`utm_source`, `utm_medium`, ...)
const TRACKING_PREFIX: &str = "utm_";

/// Remove `utm_*` query parameters from a link.
///
/// The remaining parameters keep their relative order and are re-encoded
/// with `application/x-www-form-urlencoded` rules. A link without tracking
/// parameters is returned exactly as given, and so is a link that does not
/// parse as a URL.
///
/// # Examples
///
/// ```
/// use feedflow::util::strip_tracking_params;
///
/// assert_eq!(
///     strip_tracking_params("https://a.example/x?utm_source=rss&id=5"),
///     "https://a.example/x?id=5"
/// );
/// assert_eq!(strip_tracking_params("not a url"), "not a url");
/// ```
pub fn strip_tracking_params(link: &str) -> String {
    let mut url = match Url::parse(link) {
        Ok(url) => url,
        Err(e) => {
            tracing::trace!(link = %link, error = %e, "Link is not a valid URL, keeping as-is");
            return link.to_string();
        }
    };

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !pairs.iter().any(|(k, _)| k.starts_with(TRACKING_PREFIX)) {
        return link.to_string();
    }

    let kept: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(k, _)| !k.starts_with(TRACKING_PREFIX))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_utm_and_keeps_others() {
        assert_eq!(
            strip_tracking_params("https://a.example/x?utm_source=rss&id=5"),
            "https://a.example/x?id=5"
        );
    }

    #[test]
    fn test_preserves_order_of_remaining_params() {
        assert_eq!(
            strip_tracking_params("https://a.example/x?z=1&utm_medium=email&a=2&utm_campaign=c&m=3"),
            "https://a.example/x?z=1&a=2&m=3"
        );
    }

    #[test]
    fn test_only_utm_params_drops_query() {
        assert_eq!(
            strip_tracking_params("https://s/2?utm_source=x"),
            "https://s/2"
        );
    }

    #[test]
    fn test_no_utm_returns_input_exactly() {
        for link in [
            "https://s/1",
            "https://a.example",
            "https://a.example/x?b=2&a=1",
            "https://a.example/x?q=hello%20world",
            "https://a.example/x?utmost=1",
        ] {
            assert_eq!(strip_tracking_params(link), link);
        }
    }

    #[test]
    fn test_fragment_is_kept() {
        assert_eq!(
            strip_tracking_params("https://a.example/x?utm_term=t&id=5#section"),
            "https://a.example/x?id=5#section"
        );
    }

    #[test]
    fn test_malformed_link_passes_through() {
        assert_eq!(strip_tracking_params("/relative?utm_source=x"), "/relative?utm_source=x");
        assert_eq!(strip_tracking_params(""), "");
    }

    proptest! {
        #[test]
        fn prop_result_has_no_utm_keys(
            keys in proptest::collection::vec("(utm_)?[a-z]{1,6}", 0..6),
        ) {
            let query: Vec<String> = keys.iter().enumerate().map(|(i, k)| format!("{k}={i}")).collect();
            let link = format!("https://p.example/path?{}", query.join("&"));
            let stripped = strip_tracking_params(&link);
            let url = Url::parse(&stripped).unwrap();

            prop_assert!(url.query_pairs().all(|(k, _)| !k.starts_with(TRACKING_PREFIX)));

            let expected: Vec<&String> = keys.iter().filter(|k| !k.starts_with(TRACKING_PREFIX)).collect();
            let actual: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
            prop_assert_eq!(actual.len(), expected.len());
            for (a, e) in actual.iter().zip(expected) {
                prop_assert_eq!(a, e);
            }
        }
    }
}
