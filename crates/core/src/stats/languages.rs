//! Known Ubuntu releases and translation languages.

use serde::Serialize;

/// An Ubuntu release tracked in Launchpad translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Distro {
    /// Release codename used in Launchpad URLs.
    pub codename: &'static str,
    /// Version label shown to users.
    pub version: &'static str,
}

/// A translation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    /// Launchpad language code (e.g., "pt_BR").
    pub code: &'static str,
    /// English display name.
    pub name: &'static str,
}

/// Releases, newest first.
pub const DISTROS: &[Distro] = &[
    Distro { codename: "resolute", version: "26.04" },
    Distro { codename: "questing", version: "25.10" },
    Distro { codename: "plucky", version: "25.04" },
    Distro { codename: "oracular", version: "24.10" },
    Distro { codename: "noble", version: "24.04 LTS" },
    Distro { codename: "focal", version: "20.04 LTS" },
];

pub const LANGUAGES: &[Language] = &[
    Language { code: "sv", name: "Swedish" },
    Language { code: "da", name: "Danish" },
    Language { code: "nb", name: "Norwegian Bokmål" },
    Language { code: "nn", name: "Norwegian Nynorsk" },
    Language { code: "fi", name: "Finnish" },
    Language { code: "de", name: "German" },
    Language { code: "fr", name: "French" },
    Language { code: "es", name: "Spanish" },
    Language { code: "pt_BR", name: "Portuguese (Brazil)" },
    Language { code: "it", name: "Italian" },
    Language { code: "nl", name: "Dutch" },
    Language { code: "pl", name: "Polish" },
    Language { code: "ru", name: "Russian" },
    Language { code: "uk", name: "Ukrainian" },
    Language { code: "zh_CN", name: "Chinese (Simplified)" },
    Language { code: "zh_TW", name: "Chinese (Traditional)" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "ko", name: "Korean" },
    Language { code: "ar", name: "Arabic" },
    Language { code: "cs", name: "Czech" },
    Language { code: "hu", name: "Hungarian" },
    Language { code: "ro", name: "Romanian" },
    Language { code: "tr", name: "Turkish" },
    Language { code: "el", name: "Greek" },
    Language { code: "he", name: "Hebrew" },
    Language { code: "id", name: "Indonesian" },
    Language { code: "ca", name: "Catalan" },
    Language { code: "gl", name: "Galician" },
    Language { code: "eu", name: "Basque" },
    Language { code: "pt", name: "Portuguese" },
];

const FALLBACK_LANGUAGE: &str = "sv";

pub fn find_distro(codename: &str) -> Option<&'static Distro> {
    DISTROS.iter().find(|d| d.codename == codename)
}

pub fn find_language(code: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|l| l.code == code)
}

/// Pick a known language code for a POSIX locale such as `sv_SE.UTF-8`.
///
/// Tries the full `ll_CC` form first (for `pt_BR`, `zh_TW`), then the bare
/// language part, then falls back to Swedish.
pub fn default_language(locale: Option<&str>) -> &'static str {
    let Some(locale) = locale else {
        return FALLBACK_LANGUAGE;
    };
    let base = locale
        .split(['.', '@'])
        .next()
        .unwrap_or_default();

    if let Some(lang) = find_language(base) {
        return lang.code;
    }
    let short = base.split('_').next().unwrap_or_default();
    find_language(short)
        .map(|l| l.code)
        .unwrap_or(FALLBACK_LANGUAGE)
}
