/// Locales the connector accepts for session bootstrap. Anything else is
/// rejected before a request is built.
pub(crate) const SUPPORTED_LOCALES: &[&str] = &[
    "en-us", "en-gb", "fr-fr", "fr-ca", "de-de", "es-es", "es-mx", "it-it", "pt-br", "ja-jp",
    "ko-kr", "zh-cn", "zh-tw", "nl-nl",
];

pub const DEFAULT_LOCALE: &str = "en-us";

pub fn is_supported(locale: &str) -> bool {
    SUPPORTED_LOCALES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(locale))
}

/// Lowercases the caller's locale, falling back to the default when absent
/// or blank.
pub fn normalize(locale: Option<&str>) -> String {
    locale
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}
