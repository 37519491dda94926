//! Daily verse collaborator with a deterministic local fallback.
//!
//! The provider queries a scripture API; any failure falls back to a static
//! table indexed by day of year, so the same calendar day always yields the
//! same fallback verse.

use crate::types::Language;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use verbo_config::VerseConfig;

/// A reference/text pair, optionally with a short devotional context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    /// Human-readable reference, e.g. "John 3:16".
    pub reference: String,
    /// Verse text in the requested language.
    pub text: String,
    /// Optional devotional context for the verse.
    pub context: Option<String>,
}

/// Errors returned by verse providers.
#[derive(Debug, Error)]
pub enum VerseError {
    /// API key env var is unset.
    #[error("api key not configured (env var: {0})")]
    MissingApiKey(String),
    /// Transport failure.
    #[error("http error: {0}")]
    Http(String),
    /// Non-success status from the provider.
    #[error("provider returned status {0}")]
    Status(u16),
}

/// Verse collaborator: a reference/text pair for the current day. May fail;
/// callers degrade to the static table.
#[async_trait]
pub trait VerseProvider: Send + Sync {
    async fn daily_verse(&self, language: Language) -> Result<Verse, VerseError>;
}

/// Popular books with chapter counts and a safe verse range, used to pick
/// the day's passage reference.
const POPULAR_BOOKS: &[(&str, u32, u32)] = &[
    ("JHN", 21, 50),
    ("PSA", 150, 20),
    ("PRO", 31, 30),
    ("ROM", 16, 30),
    ("MAT", 28, 40),
    ("1CO", 16, 30),
    ("EPH", 6, 25),
    ("PHP", 4, 25),
    ("COL", 4, 25),
    ("1JN", 5, 20),
];

#[derive(Debug, Deserialize)]
struct PassageResponse {
    data: PassageData,
}

#[derive(Debug, Deserialize)]
struct PassageData {
    reference: String,
    content: String,
}

/// Scripture API client resolving the day's passage per language version.
pub struct HttpVerseProvider {
    client: Client,
    config: VerseConfig,
}

impl HttpVerseProvider {
    /// Create a provider from verse config.
    pub fn new(config: VerseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn api_key(&self) -> Result<String, VerseError> {
        let Some(env_name) = self.config.api_key_env.as_deref() else {
            return Err(VerseError::MissingApiKey("<unset>".to_string()));
        };
        std::env::var(env_name).map_err(|_| VerseError::MissingApiKey(env_name.to_string()))
    }

    fn bible_id(&self, language: Language) -> &str {
        match language {
            Language::Pt => &self.config.bibles.pt,
            Language::En => &self.config.bibles.en,
            Language::Es => &self.config.bibles.es,
        }
    }

    /// Pick the day's passage reference from the popular-books table.
    fn reference_for_day(date: NaiveDate) -> String {
        let day = date.ordinal0() as usize;
        let (book, chapters, verse_range) = POPULAR_BOOKS[day % POPULAR_BOOKS.len()];
        let chapter = (day as u32 % chapters) + 1;
        let verse = (day as u32 % verse_range) + 1;
        format!("{book}.{chapter}.{verse}")
    }
}

#[async_trait]
impl VerseProvider for HttpVerseProvider {
    async fn daily_verse(&self, language: Language) -> Result<Verse, VerseError> {
        let api_key = self.api_key()?;
        let reference = Self::reference_for_day(Utc::now().date_naive());
        let url = format!(
            "{}/bibles/{}/passages/{}?content-type=text&include-notes=false\
             &include-titles=false&include-chapter-numbers=false&include-verse-numbers=false",
            self.config.api_base.trim_end_matches('/'),
            self.bible_id(language),
            reference
        );
        debug!("fetching daily verse (language={}, reference={reference})", language.as_str());

        let response = self
            .client
            .get(&url)
            .header("api-key", api_key)
            .send()
            .await
            .map_err(|err| VerseError::Http(err.to_string()))?;
        if !response.status().is_success() {
            return Err(VerseError::Status(response.status().as_u16()));
        }
        let body: PassageResponse = response
            .json()
            .await
            .map_err(|err| VerseError::Http(err.to_string()))?;
        Ok(Verse {
            reference: body.data.reference,
            text: body.data.content.trim().to_string(),
            context: None,
        })
    }
}

struct Localized {
    pt: &'static str,
    en: &'static str,
    es: &'static str,
}

impl Localized {
    fn get(&self, language: Language) -> &'static str {
        match language {
            Language::Pt => self.pt,
            Language::En => self.en,
            Language::Es => self.es,
        }
    }
}

struct FallbackVerse {
    reference: Localized,
    text: Localized,
    context: Localized,
}

/// Static fallback table. Same calendar day always yields the same entry
/// within a given table revision.
const FALLBACK_VERSES: &[FallbackVerse] = &[
    FallbackVerse {
        reference: Localized {
            pt: "João 3:16",
            en: "John 3:16",
            es: "Juan 3:16",
        },
        text: Localized {
            pt: "Porque Deus amou o mundo de tal maneira que deu o seu Filho unigênito, para que todo aquele que nele crê não pereça, mas tenha a vida eterna.",
            en: "For God so loved the world that he gave his one and only Son, that whoever believes in him shall not perish but have eternal life.",
            es: "Porque de tal manera amó Dios al mundo, que ha dado a su Hijo unigénito, para que todo aquel que en él cree, no se pierda, mas tenga vida eterna.",
        },
        context: Localized {
            pt: "Este versículo revela o imenso amor de Deus por nós. Quando você se sentir sozinho ou abandonado, lembre-se: o Criador do universo te ama.",
            en: "This verse reveals God's immense love for us. When you feel alone or abandoned, remember: the Creator of the universe loves you.",
            es: "Este versículo revela el inmenso amor de Dios por nosotros. Cuando te sientas solo o abandonado, recuerda: el Creador del universo te ama.",
        },
    },
    FallbackVerse {
        reference: Localized {
            pt: "Salmos 23:1",
            en: "Psalm 23:1",
            es: "Salmos 23:1",
        },
        text: Localized {
            pt: "O Senhor é o meu pastor, nada me faltará.",
            en: "The Lord is my shepherd, I lack nothing.",
            es: "El Señor es mi pastor, nada me faltará.",
        },
        context: Localized {
            pt: "Assim como um pastor cuida, protege e guia suas ovelhas, Deus cuida de nós em cada momento.",
            en: "Just as a shepherd cares for, protects, and guides his sheep, God cares for us in every moment.",
            es: "Así como un pastor cuida, protege y guía a sus ovejas, Dios nos cuida en cada momento.",
        },
    },
    FallbackVerse {
        reference: Localized {
            pt: "Filipenses 4:13",
            en: "Philippians 4:13",
            es: "Filipenses 4:13",
        },
        text: Localized {
            pt: "Posso todas as coisas naquele que me fortalece.",
            en: "I can do all things through Christ who strengthens me.",
            es: "Todo lo puedo en Cristo que me fortalece.",
        },
        context: Localized {
            pt: "Com Cristo podemos enfrentar qualquer situação que a vida nos apresente. Sua força vem de Deus.",
            en: "With Christ, we can face any situation life presents. Your strength comes from God.",
            es: "Con Cristo podemos enfrentar cualquier situación que la vida nos presente. Tu fuerza viene de Dios.",
        },
    },
    FallbackVerse {
        reference: Localized {
            pt: "Romanos 8:28",
            en: "Romans 8:28",
            es: "Romanos 8:28",
        },
        text: Localized {
            pt: "Sabemos que todas as coisas cooperam para o bem daqueles que amam a Deus, daqueles que são chamados segundo o seu propósito.",
            en: "And we know that in all things God works for the good of those who love him, who have been called according to his purpose.",
            es: "Y sabemos que a los que aman a Dios, todas las cosas les ayudan a bien, esto es, a los que conforme a su propósito son llamados.",
        },
        context: Localized {
            pt: "Deus pode transformar até mesmo as situações mais dolorosas em algo bom. Não desanime nas provações.",
            en: "God can transform even the most painful situations into something good. Don't be discouraged in trials.",
            es: "Dios puede transformar incluso las situaciones más dolorosas en algo bueno. No te desanimes en las pruebas.",
        },
    },
    FallbackVerse {
        reference: Localized {
            pt: "Jeremias 29:11",
            en: "Jeremiah 29:11",
            es: "Jeremías 29:11",
        },
        text: Localized {
            pt: "Porque eu bem sei os planos que tenho a vosso respeito, diz o Senhor; planos de paz, e não de mal, para vos dar um futuro e uma esperança.",
            en: "For I know the plans I have for you, declares the Lord, plans to prosper you and not to harm you, plans to give you hope and a future.",
            es: "Porque yo sé los pensamientos que tengo acerca de vosotros, dice Jehová, pensamientos de paz, y no de mal, para daros el fin que esperáis.",
        },
        context: Localized {
            pt: "Deus tem um plano para sua vida, mesmo quando o caminho parece incerto.",
            en: "God has a plan for your life, even when the path seems uncertain.",
            es: "Dios tiene un plan para tu vida, incluso cuando el camino parece incierto.",
        },
    },
    FallbackVerse {
        reference: Localized {
            pt: "1 João 4:8",
            en: "1 John 4:8",
            es: "1 Juan 4:8",
        },
        text: Localized {
            pt: "Aquele que não ama não conhece a Deus, porque Deus é amor.",
            en: "Whoever does not love does not know God, because God is love.",
            es: "El que no ama, no ha conocido a Dios; porque Dios es amor.",
        },
        context: Localized {
            pt: "Não é apenas que Deus ama, mas que Ele é a própria definição de amor.",
            en: "It's not just that God loves, but that He is the very definition of love.",
            es: "No es solo que Dios ama, sino que Él es la definición misma del amor.",
        },
    },
    FallbackVerse {
        reference: Localized {
            pt: "Provérbios 3:5-6",
            en: "Proverbs 3:5-6",
            es: "Proverbios 3:5-6",
        },
        text: Localized {
            pt: "Confia no Senhor de todo o teu coração, e não te estribes no teu próprio entendimento. Reconhece-o em todos os teus caminhos, e ele endireitará as tuas veredas.",
            en: "Trust in the Lord with all your heart and lean not on your own understanding; in all your ways submit to him, and he will make your paths straight.",
            es: "Fíate de Jehová de todo tu corazón, y no te apoyes en tu propia prudencia. Reconócelo en todos tus caminos, y él enderezará tus veredas.",
        },
        context: Localized {
            pt: "Quando colocamos Deus no centro de nossas decisões diárias, Ele traz clareza e direção.",
            en: "When we put God at the center of our daily decisions, He brings clarity and direction.",
            es: "Cuando ponemos a Dios en el centro de nuestras decisiones diarias, Él trae claridad y dirección.",
        },
    },
];

/// Deterministic fallback verse for a calendar day.
pub fn verse_of_day(language: Language, date: NaiveDate) -> Verse {
    let entry = &FALLBACK_VERSES[date.ordinal0() as usize % FALLBACK_VERSES.len()];
    Verse {
        reference: entry.reference.get(language).to_string(),
        text: entry.text.get(language).to_string(),
        context: Some(entry.context.get(language).to_string()),
    }
}

/// Daily verse façade: provider first, static table on any failure.
pub struct DailyVerseService {
    provider: Option<Arc<dyn VerseProvider>>,
}

impl DailyVerseService {
    /// Create the service with an optional live provider.
    pub fn new(provider: Option<Arc<dyn VerseProvider>>) -> Self {
        Self { provider }
    }

    /// Today's verse in the requested language. Never fails.
    pub async fn daily_verse(&self, language: Language) -> Verse {
        if let Some(provider) = &self.provider {
            match provider.daily_verse(language).await {
                Ok(verse) => return verse,
                Err(err) => {
                    warn!("verse provider failed, using fallback table: {err}");
                }
            }
        }
        verse_of_day(language, Utc::now().date_naive())
    }
}
