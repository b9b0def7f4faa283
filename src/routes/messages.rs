//! Localized error messages for the read API.

use axum::http::{header, HeaderMap, StatusCode};

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    De,
    Bn,
}

impl Lang {
    // ---
    /// Pick the language from the primary tag of the first `Accept-Language`
    /// entry, e.g. `de-DE,de;q=0.9` -> `De`. Unknown or missing -> `En`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        // ---
        let primary = headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.split(';').next())
            .and_then(|v| v.trim().split('-').next())
            .map(str::to_ascii_lowercase);

        match primary.as_deref() {
            Some("de") => Lang::De,
            Some("bn") => Lang::Bn,
            _ => Lang::En,
        }
    }

    pub fn message(self, status: StatusCode) -> &'static str {
        // ---
        match (self, status) {
            (Lang::En, StatusCode::BAD_REQUEST) => "Bad Request: No city provided.",
            (Lang::De, StatusCode::BAD_REQUEST) => "Schlechte Anfrage: Keine Stadt angegeben.",
            (Lang::Bn, StatusCode::BAD_REQUEST) => "খারাপ অনুরোধ: কোন শহর প্রদান করা হয়েছে.",

            (Lang::En, StatusCode::NOT_FOUND) => "Not Found: No city found with the provided query.",
            (Lang::De, StatusCode::NOT_FOUND) => {
                "Nicht gefunden: Mit der bereitgestellten Abfrage wurde keine Stadt gefunden."
            }
            (Lang::Bn, StatusCode::NOT_FOUND) => {
                "পাওয়া যায়নি: প্রদত্ত অনুসন্ধানে কোন শহর পাওয়া যায়নি."
            }

            (Lang::De, _) => {
                "Dienst nicht verfügbar: Der Dienst ist derzeit nicht verfügbar. Bitte versuchen Sie es später erneut."
            }
            (Lang::Bn, _) => {
                "পরিষেবা অনুপলব্ধ: পরিষেবাটি বর্তমানে অনুপলব্ধ. অনুগ্রহ করে পরে আবার চেষ্টা করুন."
            }
            (Lang::En, _) => {
                "Service Unavailable: The service is currently unavailable. Please try again later."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn test_language_negotiation() {
        // ---
        assert_eq!(Lang::from_headers(&HeaderMap::new()), Lang::En);
        assert_eq!(Lang::from_headers(&headers("en-us")), Lang::En);
        assert_eq!(Lang::from_headers(&headers("de")), Lang::De);
        assert_eq!(Lang::from_headers(&headers("de-DE,de;q=0.9,en;q=0.8")), Lang::De);
        assert_eq!(Lang::from_headers(&headers("BN")), Lang::Bn);
        assert_eq!(Lang::from_headers(&headers("fr-FR")), Lang::En);
    }

    #[test]
    fn test_messages() {
        // ---
        assert_eq!(
            Lang::En.message(StatusCode::BAD_REQUEST),
            "Bad Request: No city provided."
        );
        assert_eq!(
            Lang::De.message(StatusCode::NOT_FOUND),
            "Nicht gefunden: Mit der bereitgestellten Abfrage wurde keine Stadt gefunden."
        );
        assert!(Lang::En
            .message(StatusCode::SERVICE_UNAVAILABLE)
            .starts_with("Service Unavailable"));
    }
}
