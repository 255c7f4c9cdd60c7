use std::sync::Arc;

use engine_logging::engine_debug;

use crate::model::{ModelClient, SummarizeError};

const SYSTEM_INSTRUCTION: &str = "Tu es un assistant qui résume fidèlement le contenu d'un article \
et tu t'exprimes toujours en français, même si le texte d'origine est en anglais. Tu respectes \
scrupuleusement les consignes et tu veilles à ne pas trop rédiger car tu sais être concis.";

/// One-sentence French summaries through a [`ModelClient`].
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn ModelClient>,
}

impl Summarizer {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Callers must not pass an empty `text`.
    pub async fn summarize(&self, title: &str, text: &str) -> Result<String, SummarizeError> {
        let prompt = build_prompt(title, text);
        engine_debug!("summarizing {:?} ({} chars)", title, text.chars().count());
        let answer = self.client.chat(SYSTEM_INSTRUCTION, &prompt).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(SummarizeError::EmptyResponse);
        }
        Ok(answer.to_string())
    }
}

pub fn system_instruction() -> &'static str {
    SYSTEM_INSTRUCTION
}

pub fn build_prompt(title: &str, text: &str) -> String {
    format!(
        "Écris un résumé en français le contenu suivant. Attention, sois vigilant au fait de ne \
faire qu'une seule phrase et ne pas être trop long. Le format est très important.\n\n\
Ne fais pas tes résumés en commençant par 'cet article traite de...' ou équivalent. Le but est \
d'avoir un résumé qui adresse directement le contenu.\n\n\
Titre : {title}\n\n\
{text}"
    )
}
