use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Url};
use serde_json::Value;

const RANDOM_WORD_URL: &str = "https://random-word-api.vercel.app/api?words=1";
const DICTIONARY_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en/";
const TRANSLATE_URL: &str = "https://api.mymemory.translated.net/get";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// What the dictionary knows about a word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub word: String,
    pub definition: String,
    pub phonetic: String,
    pub example: String,
}

/// The three lookups behind the vocabulary card
pub trait VocabSource: Send + Sync + 'static {
    fn random_word(&self) -> impl Future<Output = Result<String>> + Send;

    fn define(&self, word: &str) -> impl Future<Output = Result<Definition>> + Send;

    /// Translate English `text` into `target_lang`
    fn translate(&self, text: &str, target_lang: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Public, keyless HTTP APIs
#[derive(Clone)]
pub struct HttpVocabSource {
    client: Client,
}

impl HttpVocabSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    async fn get_json(client: Client, url: Url) -> Result<Value> {
        let response = client
            .get(url)
            .send()
            .await
            .context("Vocabulary request failed")?
            .error_for_status()?;
        response.json().await.context("Invalid vocabulary response")
    }
}

fn dictionary_url(word: &str) -> Result<Url> {
    let mut url = Url::parse(DICTIONARY_URL)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Dictionary URL cannot take a path"))?
        .pop_if_empty()
        .push(word);
    Ok(url)
}

fn translate_url(text: &str, target_lang: &str) -> Result<Url> {
    let langpair = format!("en|{}", target_lang);
    Ok(Url::parse_with_params(
        TRANSLATE_URL,
        &[("q", text), ("langpair", langpair.as_str())],
    )?)
}

impl VocabSource for HttpVocabSource {
    fn random_word(&self) -> impl Future<Output = Result<String>> + Send {
        let client = self.client.clone();
        async move {
            let json = Self::get_json(client, Url::parse(RANDOM_WORD_URL)?).await?;
            parse_random_word(&json).ok_or_else(|| anyhow!("No word in response"))
        }
    }

    fn define(&self, word: &str) -> impl Future<Output = Result<Definition>> + Send {
        let client = self.client.clone();
        let word = word.to_string();
        async move {
            let json = Self::get_json(client, dictionary_url(&word)?).await?;
            Ok(parse_definition(&word, &json))
        }
    }

    fn translate(&self, text: &str, target_lang: &str) -> impl Future<Output = Result<String>> + Send {
        let client = self.client.clone();
        let url = translate_url(text, target_lang);
        async move {
            let json = Self::get_json(client, url?).await?;
            parse_translation(&json).ok_or_else(|| anyhow!("No translation in response"))
        }
    }
}

/// `["word"]`; single letters are rejected
pub fn parse_random_word(json: &Value) -> Option<String> {
    json.as_array()?
        .first()?
        .as_str()
        .filter(|w| w.chars().count() > 1)
        .map(str::to_string)
}

/// Pull the first definition, a phonetic spelling and the first example
/// out of a dictionaryapi.dev entry list
pub fn parse_definition(word: &str, json: &Value) -> Definition {
    let entry = &json[0];
    let phonetic = entry["phonetic"]
        .as_str()
        .filter(|p| !p.is_empty())
        .or_else(|| entry["phonetics"][0]["text"].as_str())
        .unwrap_or_default()
        .to_string();

    let definitions: Vec<&Value> = entry["meanings"]
        .as_array()
        .map(|meanings| {
            meanings
                .iter()
                .filter_map(|m| m["definitions"].as_array())
                .flatten()
                .collect()
        })
        .unwrap_or_default();

    let definition = definitions
        .first()
        .and_then(|d| d["definition"].as_str())
        .filter(|d| !d.is_empty())
        .unwrap_or(super::DEFINITION_UNAVAILABLE)
        .to_string();

    let example = definitions
        .iter()
        .find_map(|d| d["example"].as_str().filter(|e| !e.is_empty()))
        .unwrap_or_default()
        .to_string();

    Definition {
        word: entry["word"].as_str().unwrap_or(word).to_string(),
        definition,
        phonetic,
        example,
    }
}

/// `responseData.translatedText` when non-blank
pub fn parse_translation(json: &Value) -> Option<String> {
    json["responseData"]["translatedText"]
        .as_str()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
}
