// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};

// Idiomas com mensagens traduzidas
const SUPPORTED: [&str; 2] = ["en", "id"];
const DEFAULT_LANG: &str = "en";

// Nosso extrator de idioma
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    /// Escolhe o primeiro idioma suportado do Accept-Language.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|header_value| header_value.to_str().ok())
            .and_then(|header_str| {
                accept_language::parse(header_str)
                    .into_iter()
                    // "id-ID" -> "id"
                    .map(|tag| tag.split('-').next().unwrap_or(&tag).to_ascii_lowercase())
                    .find(|lang| SUPPORTED.contains(&lang.as_str()))
            })
            .map(Locale)
            .unwrap_or_default()
    }

    pub fn is_indonesian(&self) -> bool {
        self.0 == "id"
    }

    /// Retorna o texto no idioma do cliente.
    pub fn pick(&self, en: &str, id: &str) -> String {
        let text = if self.is_indonesian() { id } else { en };
        text.to_string()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(Locale::from_headers(&parts.headers))
    }
}
