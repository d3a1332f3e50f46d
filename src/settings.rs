//! Generation and visual settings.
//!
//! These are the two halves of the user's settings: how content is generated
//! (provider, models, requested ratio, prompt templates) and how slides look
//! (typography, colours, layout style). Both deserialize from the
//! `[generation]` and `[visual]` sections of `config.toml`; see
//! [`config`](crate::config) for loading and validation.

use crate::ratio::ApiProvider;
use serde::{Deserialize, Serialize};

/// Separator the text model is told to put between slides.
pub const SLIDE_BREAK: &str = "---SLIDE_BREAK---";

/// Placeholder replaced by the extracted thesis in image prompts.
pub const THESIS_PLACEHOLDER: &str = "[TESE_PRINCIPAL]";

/// Placeholder replaced by the article in the thesis extraction prompt.
pub const ARTICLE_PLACEHOLDER: &str = "{ARTICLE_TEXT}";

/// Heading placed between the slide prompt and the article.
pub const ARTICLE_HEADING: &str = "Analise o seguinte artigo:";

pub const DEFAULT_SLIDE_PROMPT: &str = "\
Sua missão é criar o texto para 7 slides de um carrossel a partir de um artigo.

**REGRAS ABSOLUTAS E INQUEBRÁVEIS:**
1.  **NUNCA** inclua títulos como \"SLIDE 1\", \"🔹 SLIDE 1\", ou qualquer comentário. Sua resposta deve ser **APENAS** o texto bruto dos slides.
2.  Use \"---SLIDE_BREAK---\" como o único separador entre os slides.
3.  A primeira linha de cada slide é o TÍTULO, e deve ser curta e impactante. O resto do texto é a DESCRIÇÃO. Use quebras de linha para organizar o conteúdo de forma clara e arejada, com um máximo de 300 caracteres por slide.

**REGRAS DE FORMATAÇÃO E DESTAQUE:**
- **Destaque Colorido (++palavra++):** Use este formato com **MUITA MODERAÇÃO**. Aplique-o apenas a **UMA** palavra ou pequena frase por slide que represente a ideia mais impactante.
- **Destaque Normal (**palavra**):** Use este formato para dar ênfase a termos importantes ou para estruturar a informação dentro do slide.

**ESTRUTURA DOS SLIDES:**
Adapte o artigo a esta jornada de narrativa:

SLIDE 1 (Capa): Um gancho forte. Uma frase ousada ou pergunta que desperte curiosidade.
SLIDE 2 (Problema): Descreva a dor principal que o público-alvo enfrenta.
SLIDE 3 (Custo Oculto): Mostre as consequências negativas de não resolver o problema.
SLIDE 4 (A Solução): Apresente a solução de forma clara.
SLIDE 5 (Prova/Benefício): Apresente um resultado tangível ou um benefício claro.
SLIDE 6 (Bônus/Diferencial): Apresente um recurso extra ou um insight avançado.
SLIDE 7 (CTA): Uma chamada para ação clara e direta. Diga ao leitor o que fazer a seguir.";

pub const DEFAULT_IMAGE_PROMPT: &str = "\
Imagem altamente simbólica e emblemática no formato especificado, com um único símbolo de destaque dentro de um vazio absoluto. Composição em preto e branco com iluminação premiada e temática cyberpunk. O gancho visual deve ser relacionado à tese principal: [TESE_PRINCIPAL]. No vazio absoluto, um só símbolo emerge.
Silhueta isolada entre luz e sombra — ora luz sobre trevas, ora trevas sobre luz.
Escolha é sorte, não razão: uma forma arquetípica se revela.
Talvez seja o tempo escoando em silêncio da ampulheta.
Ou o gelo oculto sob a superfície.
Ou nuvens que sussurram dados ao vento.
Ou um autômato sonhando circuitos.
Nada mais.
Nenhum ruído.
A imagem se cala para que o símbolo fale.
E tudo ao redor desaparece.";

pub const LAST_SLIDE_IMAGE_PROMPT: &str = "\
Imagem altamente simbólica para uma conclusão ou chamada para ação, no formato especificado. Foco claro em um caminho adiante ou um destino alcançado. Composição em preto e branco, iluminação premiada, temática cyberpunk com um tom de clareza. O gancho visual deve estar relacionado à tese principal: [TESE_PRINCIPAL]. A imagem deve evocar um sentimento de 'próximo passo', como um caminho iluminado no vazio ou uma porta se abrindo para a luz. Simplicidade e clareza são essenciais.";

pub const THESIS_EXTRACTION_PROMPT: &str = "\
Resuma a tese principal do seguinte artigo em uma frase curta e impactante para servir de base para uma imagem conceitual. Responda apenas com a frase.

ARTIGO:
{ARTICLE_TEXT}
";

/// Content generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationSettings {
    pub api_provider: ApiProvider,
    pub text_model: String,
    pub image_model: String,
    /// Requested ratio; not necessarily supported by `api_provider`.
    pub aspect_ratio: String,
    pub slide_prompt: String,
    pub image_prompt: String,
}

impl GenerationSettings {
    /// The ratio slides are actually rendered at.
    pub fn effective_ratio(&self) -> &'static str {
        self.api_provider.effective_ratio(&self.aspect_ratio)
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            api_provider: ApiProvider::OpenAi,
            text_model: "gpt-4.1-mini-2025-04-14".to_string(),
            image_model: "dall-e-3".to_string(),
            aspect_ratio: "4:5".to_string(),
            slide_prompt: DEFAULT_SLIDE_PROMPT.to_string(),
            image_prompt: DEFAULT_IMAGE_PROMPT.to_string(),
        }
    }
}

/// Default models per provider.
pub fn default_models(provider: ApiProvider) -> (&'static str, &'static str) {
    match provider {
        ApiProvider::Gemini => ("gemini-2.5-flash", "imagen-3.0-generate-002"),
        ApiProvider::OpenAi => ("gpt-4.1-mini-2025-04-14", "dall-e-3"),
    }
}

/// Everything that controls how a slide is drawn.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VisualSettings {
    pub typography: Typography,
    pub colors: Colors,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Typography {
    /// CSS-style family list, e.g. `"Inter, sans-serif"`. The first family
    /// selects the font files.
    pub font_family: String,
    /// Title size in preview pixels.
    pub title_font_size: f32,
    /// Description size in preview pixels.
    pub description_font_size: f32,
    /// Line height as a multiple of the font size.
    pub line_spacing: f32,
}

impl Default for Typography {
    fn default() -> Self {
        Self {
            font_family: "Inter, sans-serif".to_string(),
            title_font_size: 32.0,
            description_font_size: 18.0,
            line_spacing: 1.5,
        }
    }
}

impl Typography {
    /// The primary family name, unquoted (`"'Playfair Display', serif"` →
    /// `Playfair Display`).
    pub fn primary_family(&self) -> &str {
        self.font_family
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches(|c| c == '\'' || c == '"')
    }
}

/// Colour tokens (`#RRGGBB`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Colors {
    /// Text on dark and image backgrounds.
    pub text_light: String,
    /// Text on light backgrounds.
    pub text_dark: String,
    /// `++highlighted++` words.
    pub highlight: String,
    pub slide_bg_light: String,
    pub slide_bg_dark: String,
    pub slide_bg_accent: String,
    /// Flat overlay painted over image backgrounds.
    pub overlay_color: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            text_light: "#FFFFFF".to_string(),
            text_dark: "#000000".to_string(),
            highlight: "#F97316".to_string(),
            slide_bg_light: "#FFFFFF".to_string(),
            slide_bg_dark: "#000000".to_string(),
            slide_bg_accent: "#F3F4F6".to_string(),
            overlay_color: "#000000".to_string(),
        }
    }
}

impl Colors {
    /// All tokens with their config key, for validation messages.
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("text_light", &self.text_light),
            ("text_dark", &self.text_dark),
            ("highlight", &self.highlight),
            ("slide_bg_light", &self.slide_bg_light),
            ("slide_bg_dark", &self.slide_bg_dark),
            ("slide_bg_accent", &self.slide_bg_accent),
            ("overlay_color", &self.overlay_color),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    pub text_alignment: TextAlignment,
    /// Padding on every side, in preview pixels.
    pub margin: f32,
    /// Overlay opacity over image backgrounds, 0.0–1.0.
    pub overlay_opacity: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            text_alignment: TextAlignment::Center,
            margin: 60.0,
            overlay_opacity: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_look() {
        let v = VisualSettings::default();
        assert_eq!(v.typography.title_font_size, 32.0);
        assert_eq!(v.typography.description_font_size, 18.0);
        assert_eq!(v.colors.highlight, "#F97316");
        assert_eq!(v.style.text_alignment, TextAlignment::Center);
        assert_eq!(v.style.overlay_opacity, 0.3);
    }

    #[test]
    fn default_generation_renders_four_five() {
        let g = GenerationSettings::default();
        assert_eq!(g.api_provider, ApiProvider::OpenAi);
        assert_eq!(g.effective_ratio(), "4:5");
    }

    #[test]
    fn effective_ratio_follows_provider() {
        let g = GenerationSettings {
            aspect_ratio: "3:4".into(),
            ..GenerationSettings::default()
        };
        assert_eq!(g.effective_ratio(), "9:16");
        let g = GenerationSettings {
            api_provider: ApiProvider::Gemini,
            ..g
        };
        assert_eq!(g.effective_ratio(), "3:4");
    }

    #[test]
    fn primary_family_strips_quotes_and_fallbacks() {
        let mut t = Typography::default();
        assert_eq!(t.primary_family(), "Inter");
        t.font_family = "'Playfair Display', serif".into();
        assert_eq!(t.primary_family(), "Playfair Display");
        t.font_family = "\"Cormorant Garamond\"".into();
        assert_eq!(t.primary_family(), "Cormorant Garamond");
    }

    #[test]
    fn prompts_carry_placeholders() {
        assert!(DEFAULT_IMAGE_PROMPT.contains(THESIS_PLACEHOLDER));
        assert!(LAST_SLIDE_IMAGE_PROMPT.contains(THESIS_PLACEHOLDER));
        assert!(THESIS_EXTRACTION_PROMPT.contains(ARTICLE_PLACEHOLDER));
        assert!(DEFAULT_SLIDE_PROMPT.contains(SLIDE_BREAK));
    }

    #[test]
    fn default_prompts_are_the_portuguese_templates() {
        assert_eq!(THESIS_PLACEHOLDER, "[TESE_PRINCIPAL]");
        assert!(DEFAULT_SLIDE_PROMPT.starts_with("Sua missão é criar o texto para 7 slides"));
        assert!(DEFAULT_SLIDE_PROMPT.contains("(++palavra++)"));
        assert!(DEFAULT_IMAGE_PROMPT.contains("tese principal: [TESE_PRINCIPAL]."));
        assert!(DEFAULT_IMAGE_PROMPT.ends_with("E tudo ao redor desaparece."));
        assert!(LAST_SLIDE_IMAGE_PROMPT.ends_with("Simplicidade e clareza são essenciais."));
        assert!(THESIS_EXTRACTION_PROMPT.ends_with("ARTIGO:\n{ARTICLE_TEXT}\n"));
        assert_eq!(GenerationSettings::default().image_prompt, DEFAULT_IMAGE_PROMPT);
    }

    #[test]
    fn partial_visual_settings_keep_defaults() {
        let v: VisualSettings = toml::from_str("[style]\nmargin = 40.0\n").unwrap();
        assert_eq!(v.style.margin, 40.0);
        assert_eq!(v.style.overlay_opacity, 0.3);
        assert_eq!(v.colors, Colors::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<VisualSettings>("[style]\npadding = 4.0\n").is_err());
    }
}
