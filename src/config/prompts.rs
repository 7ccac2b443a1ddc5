//! Prompt templates for Youtubot.
//!
//! Templates are organised as `prompt name -> language code -> template`.
//! A custom TOML file can override any (prompt, language) pair:
//!
//! ```toml
//! evaluation_prompt = "Rate this answer ... {query} ... {response}"
//!
//! [rag_prompt]
//! en = "Context: {context}\nQuestion: {question}"
//! it = "Contesto: {context}\nDomanda: {question}"
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Prompt used to answer from retrieved transcript passages.
pub const RAG_PROMPT: &str = "rag_prompt";
/// Prompt used to answer from a web search snippet.
pub const WEB_QA_PROMPT: &str = "web_qa_prompt";
/// Fixed message returned when neither the transcript nor the web had content.
pub const NO_CONTEXT_PROMPT: &str = "no_context_prompt";

const FALLBACK_LANGUAGE: &str = "en";

/// Collection of all prompt templates.
#[derive(Debug, Clone)]
pub struct Prompts {
    templates: HashMap<String, HashMap<String, String>>,
    /// Self-evaluation prompt with `{query}` and `{response}` placeholders.
    pub evaluation: String,
}

/// On-disk layout of a custom prompt file.
#[derive(Debug, Deserialize)]
struct PromptFile {
    evaluation_prompt: Option<String>,
    #[serde(flatten)]
    tables: HashMap<String, HashMap<String, String>>,
}

impl Default for Prompts {
    fn default() -> Self {
        let mut templates: HashMap<String, HashMap<String, String>> = HashMap::new();

        let rag = [
            ("en", "Use the following pieces of context from a video transcript to answer the question. If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer in {language}."),
            ("es", "Utiliza los siguientes fragmentos de la transcripción de un vídeo para responder a la pregunta. Si no sabes la respuesta, di simplemente que no la sabes, no intentes inventarla.\n\nContexto:\n{context}\n\nPregunta: {question}\n\nResponde en {language}."),
            ("fr", "Utilise les extraits suivants de la transcription d'une vidéo pour répondre à la question. Si tu ne connais pas la réponse, dis simplement que tu ne sais pas, n'invente rien.\n\nContexte :\n{context}\n\nQuestion : {question}\n\nRéponds en {language}."),
            ("de", "Beantworte die Frage anhand der folgenden Ausschnitte aus einem Videotranskript. Wenn du die Antwort nicht kennst, sag einfach, dass du sie nicht weißt, und erfinde nichts.\n\nKontext:\n{context}\n\nFrage: {question}\n\nAntworte auf {language}."),
            ("tr", "Soruyu yanıtlamak için bir video dökümünden alınan aşağıdaki bölümleri kullan. Cevabı bilmiyorsan bilmediğini söyle, bir cevap uydurmaya çalışma.\n\nBağlam:\n{context}\n\nSoru: {question}\n\nCevabı {language} dilinde ver."),
        ];

        let web_qa = [
            ("en", "The video transcript did not cover this question, so here is a snippet from a web search. Answer the question using the snippet. If the snippet is not relevant, say so briefly.\n\nWeb snippet:\n{context}\n\nQuestion: {question}\n\nAnswer in {language}."),
            ("es", "La transcripción del vídeo no trataba esta pregunta, así que aquí tienes un fragmento de una búsqueda web. Responde a la pregunta usando el fragmento. Si no es relevante, dilo brevemente.\n\nFragmento web:\n{context}\n\nPregunta: {question}\n\nResponde en {language}."),
            ("fr", "La transcription de la vidéo ne couvrait pas cette question, voici donc un extrait d'une recherche web. Réponds à la question à l'aide de cet extrait. S'il n'est pas pertinent, dis-le brièvement.\n\nExtrait web :\n{context}\n\nQuestion : {question}\n\nRéponds en {language}."),
            ("de", "Das Videotranskript hat diese Frage nicht behandelt, daher folgt ein Ausschnitt aus einer Websuche. Beantworte die Frage mithilfe des Ausschnitts. Wenn er nicht relevant ist, sag das kurz.\n\nWeb-Ausschnitt:\n{context}\n\nFrage: {question}\n\nAntworte auf {language}."),
            ("tr", "Video dökümü bu soruyu kapsamıyordu, bu yüzden bir web aramasından bir alıntı aşağıda. Soruyu bu alıntıyı kullanarak yanıtla. Alıntı ilgili değilse bunu kısaca belirt.\n\nWeb alıntısı:\n{context}\n\nSoru: {question}\n\nCevabı {language} dilinde ver."),
        ];

        let no_context = [
            ("en", "Sorry, I couldn't find any content about this in the video or on the web."),
            ("es", "Lo siento, no encontré contenido sobre esto ni en el vídeo ni en la web."),
            ("fr", "Désolé, je n'ai trouvé aucun contenu à ce sujet ni dans la vidéo ni sur le web."),
            ("de", "Leider habe ich dazu weder im Video noch im Web Inhalte gefunden."),
            ("tr", "Üzgünüm, bu konuda ne videoda ne de web'de içerik bulamadım."),
        ];

        for (name, table) in [(RAG_PROMPT, &rag), (WEB_QA_PROMPT, &web_qa), (NO_CONTEXT_PROMPT, &no_context)] {
            templates.insert(
                name.to_string(),
                table
                    .iter()
                    .map(|(lang, text)| (lang.to_string(), text.to_string()))
                    .collect(),
            );
        }

        Self {
            templates,
            evaluation: "You are grading an answer to a user's question.\n\nQuestion: {query}\n\nAnswer: {response}\n\nRate how well the answer addresses the question on a scale from 0.0 (useless) to 1.0 (complete and accurate). Reply with the score as a decimal number such as 0.7, followed by one short sentence of justification.".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, merging an optional custom file over the defaults.
    pub fn load(custom_file: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(file) = custom_file {
            let path = shellexpand::tilde(file).to_string();
            let path = Path::new(&path);
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                prompts.merge_toml(&content)?;
            } else {
                tracing::warn!("Custom prompt file {:?} not found, using defaults", path);
            }
        }

        Ok(prompts)
    }

    /// Merge prompt tables from TOML text over the current templates.
    pub fn merge_toml(&mut self, content: &str) -> crate::error::Result<()> {
        let file: PromptFile = toml::from_str(content)?;

        if let Some(evaluation) = file.evaluation_prompt {
            self.evaluation = evaluation;
        }

        for (name, table) in file.tables {
            self.templates.entry(name).or_default().extend(table);
        }

        Ok(())
    }

    /// Template for `name` in `language`, falling back to English.
    pub fn template(&self, name: &str, language: &str) -> Option<&str> {
        let table = self.templates.get(name)?;
        table
            .get(language)
            .or_else(|| table.get(FALLBACK_LANGUAGE))
            .map(String::as_str)
    }

    /// Template for `name` in exactly `language`, without fallback.
    pub fn template_exact(&self, name: &str, language: &str) -> Option<&str> {
        self.templates.get(name)?.get(language).map(String::as_str)
    }

    /// Substitute `{key}` placeholders in a single pass.
    ///
    /// Unknown placeholders are left as written and `{{` / `}}` produce
    /// literal braces. Substituted values are never re-scanned, so a question
    /// containing `{context}` stays as typed.
    pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('{') {
                match tail[1..].find('}') {
                    Some(end) => {
                        let key = &tail[1..=end];
                        match vars.iter().find(|(k, _)| *k == key) {
                            Some((_, value)) => out.push_str(value),
                            None => out.push_str(&tail[..end + 2]),
                        }
                        rest = &tail[end + 2..];
                    }
                    None => {
                        out.push_str(tail);
                        rest = "";
                    }
                }
            } else {
                out.push('}');
                rest = &tail[1..];
            }
        }

        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        for lang in ["en", "es", "fr", "de", "tr"] {
            assert!(prompts.template_exact(RAG_PROMPT, lang).unwrap().contains("{context}"));
            assert!(prompts.template_exact(WEB_QA_PROMPT, lang).unwrap().contains("{question}"));
            assert!(prompts.template_exact(NO_CONTEXT_PROMPT, lang).is_some());
        }
        assert!(prompts.evaluation.contains("{query}"));
        assert!(prompts.evaluation.contains("{response}"));
    }

    #[test]
    fn test_template_falls_back_to_english() {
        let prompts = Prompts::default();
        assert_eq!(
            prompts.template(RAG_PROMPT, "ja"),
            prompts.template_exact(RAG_PROMPT, "en")
        );
        assert!(prompts.template_exact(RAG_PROMPT, "ja").is_none());
        assert!(prompts.template("missing_prompt", "en").is_none());
    }

    #[test]
    fn test_render_template() {
        let result = Prompts::render(
            "Context: {context}\nQuestion: {question}\n{unknown}",
            &[("context", "the text"), ("question", "why?")],
        );
        assert_eq!(result, "Context: the text\nQuestion: why?\n{unknown}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let result = Prompts::render(
            "{question} / {context}",
            &[("question", "what is {context}?"), ("context", "ctx")],
        );
        assert_eq!(result, "what is {context}? / ctx");
    }

    #[test]
    fn test_render_escaped_braces() {
        let result = Prompts::render("{{\"score\": {value}}}", &[("value", "0.5")]);
        assert_eq!(result, "{\"score\": 0.5}");
    }

    #[test]
    fn test_merge_custom_file() {
        let mut prompts = Prompts::default();
        prompts
            .merge_toml(
                r#"
                evaluation_prompt = "Score {response} for {query}"

                [rag_prompt]
                it = "Contesto: {context} Domanda: {question}"
                en = "EN {context} {question}"
                "#,
            )
            .unwrap();

        assert_eq!(prompts.evaluation, "Score {response} for {query}");
        assert_eq!(prompts.template(RAG_PROMPT, "it"), Some("Contesto: {context} Domanda: {question}"));
        assert_eq!(prompts.template(RAG_PROMPT, "en"), Some("EN {context} {question}"));
        assert!(prompts.template_exact(RAG_PROMPT, "fr").is_some());
    }
}
