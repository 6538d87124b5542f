use shared::error::BridgeError;
use url::Url;

pub const TELEGRAM_HOST: &str = "t.me";

/// Absolute `http`/`https` link suitable for `web_app_open_link`.
pub fn validate_link(raw: &str) -> Result<Url, BridgeError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| BridgeError::url_invalid(format!("'{raw}' is not a valid url: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(BridgeError::url_invalid(format!(
            "unsupported url scheme '{scheme}' in '{raw}'"
        ))),
    }
}

/// Path plus query of a `t.me` link, as expected by `web_app_open_tg_link`.
pub fn telegram_link_path(raw: &str) -> Result<String, BridgeError> {
    let url = validate_link(raw)?;
    if url.host_str() != Some(TELEGRAM_HOST) {
        return Err(BridgeError::url_invalid(format!(
            "'{raw}' is not a {TELEGRAM_HOST} link"
        )));
    }

    let mut path_full = url.path().to_string();
    if let Some(query) = url.query() {
        path_full.push('?');
        path_full.push_str(query);
    }
    Ok(path_full)
}

/// Accepts `https://t.me/$<slug>` and `https://t.me/invoice/<slug>`.
pub fn invoice_slug(raw: &str) -> Result<String, BridgeError> {
    let invalid = || BridgeError::url_invalid(format!("'{raw}' is not an invoice link"));

    let url = validate_link(raw)?;
    if url.scheme() != "https" || url.host_str() != Some(TELEGRAM_HOST) {
        return Err(invalid());
    }

    let path = url.path();
    let slug = path
        .strip_prefix("/$")
        .or_else(|| path.strip_prefix("/invoice/"))
        .ok_or_else(invalid)?;

    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '=' | '-'));
    if !valid {
        return Err(invalid());
    }
    Ok(slug.to_string())
}
