//! Country-consistent browser fingerprints.
//!
//! The provisioned profile should look local to the number it is signing up:
//! locale, timezone, and language headers all follow the identifier's
//! country. Unknown countries fall back to a US profile rather than failing
//! the attempt.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::config::AllocatorConfig;

// ============================================================================
// CountryProfile
// ============================================================================

/// Static per-country fingerprint ingredients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryProfile {
    /// ISO 3166-1 alpha-2 code.
    pub iso_country: &'static str,
    /// BCP 47 locale tag.
    pub locale: &'static str,
    /// IANA timezone name.
    pub timezone: &'static str,
    /// `Accept-Language` header value.
    pub accept_language: &'static str,
}

/// Known country profiles. Kept small on purpose: these are the countries
/// the phone lists actually carry.
const PROFILES: &[CountryProfile] = &[
    CountryProfile { iso_country: "US", locale: "en-US", timezone: "America/New_York", accept_language: "en-US,en;q=0.9" },
    CountryProfile { iso_country: "GB", locale: "en-GB", timezone: "Europe/London", accept_language: "en-GB,en;q=0.9" },
    CountryProfile { iso_country: "UA", locale: "uk-UA", timezone: "Europe/Kyiv", accept_language: "uk-UA,uk;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "BY", locale: "ru-BY", timezone: "Europe/Minsk", accept_language: "ru-BY,ru;q=0.9,en;q=0.5" },
    CountryProfile { iso_country: "RU", locale: "ru-RU", timezone: "Europe/Moscow", accept_language: "ru-RU,ru;q=0.9,en;q=0.5" },
    CountryProfile { iso_country: "DE", locale: "de-DE", timezone: "Europe/Berlin", accept_language: "de-DE,de;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "FR", locale: "fr-FR", timezone: "Europe/Paris", accept_language: "fr-FR,fr;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "PL", locale: "pl-PL", timezone: "Europe/Warsaw", accept_language: "pl-PL,pl;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "ES", locale: "es-ES", timezone: "Europe/Madrid", accept_language: "es-ES,es;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "IN", locale: "en-IN", timezone: "Asia/Kolkata", accept_language: "en-IN,en;q=0.9,hi;q=0.6" },
    CountryProfile { iso_country: "PK", locale: "en-PK", timezone: "Asia/Karachi", accept_language: "en-PK,en;q=0.9,ur;q=0.6" },
    CountryProfile { iso_country: "BD", locale: "bn-BD", timezone: "Asia/Dhaka", accept_language: "bn-BD,bn;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "NG", locale: "en-NG", timezone: "Africa/Lagos", accept_language: "en-NG,en;q=0.9" },
    CountryProfile { iso_country: "KE", locale: "en-KE", timezone: "Africa/Nairobi", accept_language: "en-KE,en;q=0.9,sw;q=0.6" },
    CountryProfile { iso_country: "BR", locale: "pt-BR", timezone: "America/Sao_Paulo", accept_language: "pt-BR,pt;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "MX", locale: "es-MX", timezone: "America/Mexico_City", accept_language: "es-MX,es;q=0.9,en;q=0.6" },
    CountryProfile { iso_country: "JP", locale: "ja-JP", timezone: "Asia/Tokyo", accept_language: "ja-JP,ja;q=0.9,en;q=0.5" },
    CountryProfile { iso_country: "AU", locale: "en-AU", timezone: "Australia/Sydney", accept_language: "en-AU,en;q=0.9" },
    CountryProfile { iso_country: "AE", locale: "ar-AE", timezone: "Asia/Dubai", accept_language: "ar-AE,ar;q=0.9,en;q=0.7" },
    CountryProfile { iso_country: "IL", locale: "he-IL", timezone: "Asia/Jerusalem", accept_language: "he-IL,he;q=0.9,en;q=0.7" },
];

/// Looks up the profile for a country, falling back to US.
#[must_use]
pub fn profile_for(iso_country: &str) -> CountryProfile {
    PROFILES
        .iter()
        .find(|p| p.iso_country.eq_ignore_ascii_case(iso_country))
        .copied()
        .unwrap_or(PROFILES[0])
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Fingerprint descriptor sent to the profile allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub os_type: String,
    pub browser_type: String,
    pub locale: String,
    pub timezone: String,
    pub accept_language: String,
}

impl Fingerprint {
    /// Builds the fingerprint for an attempt routed to a country.
    #[must_use]
    pub fn for_route(iso_country: &str, allocator: &AllocatorConfig) -> Self {
        let profile = profile_for(iso_country);
        Self {
            os_type: allocator.os_type.clone(),
            browser_type: allocator.browser_type.clone(),
            locale: profile.locale.to_string(),
            timezone: profile.timezone.to_string(),
            accept_language: profile.accept_language.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_country_lookup() {
        let profile = profile_for("UA");
        assert_eq!(profile.locale, "uk-UA");
        assert_eq!(profile.timezone, "Europe/Kyiv");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(profile_for("ua"), profile_for("UA"));
    }

    #[test]
    fn test_unknown_country_falls_back_to_us() {
        let profile = profile_for("ZZ");
        assert_eq!(profile.iso_country, "US");
    }

    #[test]
    fn test_fingerprint_follows_route() {
        let allocator = AllocatorConfig::default();
        let fp = Fingerprint::for_route("JP", &allocator);
        assert_eq!(fp.timezone, "Asia/Tokyo");
        assert_eq!(fp.browser_type, allocator.browser_type);
    }
}
