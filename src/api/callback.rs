use axum::{Extension, extract::RawQuery, response::Html};
use tokio::sync::mpsc::UnboundedSender;
use url::{Url, form_urlencoded};

/// Where the callback forwards redirects to.
#[derive(Debug, Clone)]
pub struct CallbackState {
    pub redirect_uri: String,
    pub redirects: UnboundedSender<String>,
}

/// Receives the OAuth redirect and forwards the full redirect URL.
///
/// The handler does not interpret the query; parsing and the code exchange
/// happen in the authorizer, exactly as for a pasted URL.
pub async fn callback(
    RawQuery(query): RawQuery,
    Extension(state): Extension<CallbackState>,
) -> Html<&'static str> {
    let redirected = redirected_url(&state.redirect_uri, query.as_deref());

    if state.redirects.send(redirected).is_err() {
        return Html("<h4>vodsync is no longer waiting for a login.</h4>");
    }

    Html("<h2>Login received.</h2><p>Return to vodsync, this window can be closed.</p>")
}

/// Appends the callback query to the configured redirect URI, keeping any
/// parameters the URI already carries.
pub fn redirected_url(redirect_uri: &str, query: Option<&str>) -> String {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return redirect_uri.to_string();
    };

    match Url::parse(redirect_uri) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .extend_pairs(form_urlencoded::parse(query.as_bytes()));
            url.to_string()
        }
        Err(_) => {
            let separator = if redirect_uri.contains('?') { '&' } else { '?' };
            format!("{}{}{}", redirect_uri, separator, query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_response_code;

    #[test]
    fn test_query_is_appended() {
        assert_eq!(
            redirected_url("http://127.0.0.1:8888/callback", Some("code=abc&state=xyz")),
            "http://127.0.0.1:8888/callback?code=abc&state=xyz"
        );
    }

    #[test]
    fn test_existing_query_is_kept() {
        let url = redirected_url(
            "http://127.0.0.1:8888/callback?source=vodsync",
            Some("code=abc"),
        );
        assert_eq!(url, "http://127.0.0.1:8888/callback?source=vodsync&code=abc");
        assert_eq!(parse_response_code(&url).unwrap(), "abc");
    }

    #[test]
    fn test_encoded_code_survives() {
        let url = redirected_url("http://127.0.0.1:8888/callback", Some("code=a%2Fb"));
        assert_eq!(parse_response_code(&url).unwrap(), "a/b");
    }

    #[test]
    fn test_no_query_forwards_redirect_uri() {
        assert_eq!(
            redirected_url("http://127.0.0.1:8888/callback", None),
            "http://127.0.0.1:8888/callback"
        );
    }
}
