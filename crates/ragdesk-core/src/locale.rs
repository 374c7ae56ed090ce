//! Display strings for the chat widget in the two supported locales.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    /// Pick a locale from a tag such as `es-AR` or `en_US.UTF-8`.
    pub fn detect(tag: &str) -> Self {
        if tag.to_ascii_lowercase().starts_with("es") {
            Self::Es
        } else {
            Self::En
        }
    }

    /// Look up a `chatbot.*` string. Keys missing in this locale fall back
    /// to English; unknown keys come back unchanged.
    pub fn text<'a>(&self, key: &'a str) -> &'a str {
        let found = match self {
            Self::En => english(key),
            Self::Es => spanish(key).or_else(|| english(key)),
        };
        found.unwrap_or(key)
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::Es => write!(f, "es"),
        }
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "es" => Ok(Self::Es),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

fn english(key: &str) -> Option<&'static str> {
    Some(match key {
        "chatbot.title" => "AI Assistant",
        "chatbot.welcome" => "Hi! How can I help you today?",
        "chatbot.placeholder" => "Type your message...",
        "chatbot.send" => "Send message",
        "chatbot.typing" => "Typing...",
        "chatbot.error" => "Sorry, I encountered an error. Please try again.",
        "chatbot.open" => "Open chat",
        "chatbot.close" => "Close chat",
        "chatbot.clear" => "Clear conversation",
        _ => return None,
    })
}

fn spanish(key: &str) -> Option<&'static str> {
    Some(match key {
        "chatbot.title" => "Asistente IA",
        "chatbot.welcome" => "¡Hola! ¿En qué puedo ayudarte hoy?",
        "chatbot.placeholder" => "Escribe tu mensaje...",
        "chatbot.send" => "Enviar mensaje",
        "chatbot.typing" => "Escribiendo...",
        "chatbot.error" => "Lo siento, ocurrió un error. Por favor, inténtalo de nuevo.",
        "chatbot.open" => "Abrir chat",
        "chatbot.close" => "Cerrar chat",
        "chatbot.clear" => "Borrar conversación",
        _ => return None,
    })
}
