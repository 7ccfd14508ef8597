//! User-facing strings for the supported interface languages

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Locale {
    #[serde(rename = "pt-br")]
    PtBr,
    #[default]
    #[serde(rename = "en-us")]
    EnUs,
    #[serde(rename = "es-es")]
    EsEs,
}

/// Everything the engine says or writes into the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strings {
    pub activated: &'static str,
    pub deactivated: &'static str,
    pub loading: &'static str,
    pub write_to: &'static str,
    pub send: &'static str,
    pub record: &'static str,
    pub play: &'static str,
    pub language_changed: &'static str,
    pub contact: &'static str,
    pub image: &'static str,
    pub image_no_description: &'static str,
    pub received: &'static str,
    pub sent: &'static str,
}

const PT_BR: Strings = Strings {
    activated: "Acessibilidade Ativada",
    deactivated: "Acessibilidade Desativada",
    loading: "Aguardando WhatsApp...",
    write_to: "Escrever para: ",
    send: "Enviar mensagem",
    record: "Gravar áudio",
    play: "Reproduzir",
    language_changed: "Idioma: Português",
    contact: "Contato: ",
    image: "Imagem: ",
    image_no_description: "Imagem sem descrição",
    received: "Mensagem recebida: ",
    sent: "Mensagem enviada: ",
};

const EN_US: Strings = Strings {
    activated: "Accessibility Activated",
    deactivated: "Accessibility Deactivated",
    loading: "Waiting for WhatsApp...",
    write_to: "Write to: ",
    send: "Send",
    record: "Record voice",
    play: "Play",
    language_changed: "Language: English",
    contact: "Contact: ",
    image: "Image: ",
    image_no_description: "Image with no description",
    received: "Message received: ",
    sent: "Message sent: ",
};

const ES_ES: Strings = Strings {
    activated: "Accesibilidad Activada",
    deactivated: "Accesibilidad Desactivada",
    loading: "Esperando a WhatsApp...",
    write_to: "Escribir a: ",
    send: "Enviar",
    record: "Grabar voz",
    play: "Reproducir",
    language_changed: "Idioma: Español",
    contact: "Contacto: ",
    image: "Imagen: ",
    image_no_description: "Imagen sin descripción",
    received: "Mensaje recibido: ",
    sent: "Mensaje enviado: ",
};

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::PtBr, Locale::EnUs, Locale::EsEs];

    /// Resolve a BCP 47 tag such as `navigator.language`
    ///
    /// Exact tags win, then the primary language subtag; anything else is English.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_lowercase().replace('_', "-");
        if let Some(exact) = Self::ALL.iter().find(|l| l.tag() == tag) {
            return *exact;
        }
        match tag.split('-').next().unwrap_or("") {
            "pt" => Locale::PtBr,
            "es" => Locale::EsEs,
            _ => Locale::EnUs,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Locale::PtBr => "pt-br",
            Locale::EnUs => "en-us",
            Locale::EsEs => "es-es",
        }
    }

    /// Pick the interface language: the user's stored choice, then the
    /// configured one, then the browser language tag
    pub fn resolve(stored: Option<Locale>, configured: Option<Locale>, browser_tag: &str) -> Self {
        stored
            .or(configured)
            .unwrap_or_else(|| Self::from_tag(browser_tag))
    }

    /// Next language in the cycle
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn strings(self) -> &'static Strings {
        match self {
            Locale::PtBr => &PT_BR,
            Locale::EnUs => &EN_US,
            Locale::EsEs => &ES_ES,
        }
    }
}
