pub(super) fn fetch(url: &str) -> crate::Result<String> {
    reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(crate::Error::wrap)
}
