//! Hidden form field extraction for web-forms postbacks

use scraper::{Html, Selector};

pub const VIEW_STATE: &str = "__VIEWSTATE";
pub const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
pub const EVENT_VALIDATION: &str = "__EVENTVALIDATION";

/// The hidden fields a web-forms page needs echoed back on its next postback.
///
/// Values are taken from one response and are only good for the request
/// that immediately follows it. Missing fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenFieldSet {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
}

impl HiddenFieldSet {
    /// Extract the hidden fields from an HTML document. Never fails.
    pub fn extract(html: &str) -> Self {
        let document = Html::parse_document(html);

        Self {
            view_state: input_value(&document, VIEW_STATE),
            view_state_generator: input_value(&document, VIEW_STATE_GENERATOR),
            event_validation: input_value(&document, EVENT_VALIDATION),
        }
    }

    /// Field name / value pairs in postback order
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (VIEW_STATE, self.view_state.as_str()),
            (VIEW_STATE_GENERATOR, self.view_state_generator.as_str()),
            (EVENT_VALIDATION, self.event_validation.as_str()),
        ]
    }

    /// Names of the fields that came back empty
    pub fn missing(&self) -> Vec<&'static str> {
        self.pairs()
            .iter()
            .filter(|(_, v)| v.is_empty())
            .map(|(k, _)| *k)
            .collect()
    }

    /// Start a form body carrying these fields
    pub fn into_form(self) -> Vec<(String, String)> {
        vec![
            (VIEW_STATE.to_string(), self.view_state),
            (VIEW_STATE_GENERATOR.to_string(), self.view_state_generator),
            (EVENT_VALIDATION.to_string(), self.event_validation),
        ]
    }
}

fn input_value(document: &Html, name: &str) -> String {
    // Field names are fixed identifiers, so the selector always parses.
    let Ok(selector) = Selector::parse(&format!(r#"input[name="{}"]"#, name)) else {
        return String::new();
    };

    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("value"))
        .unwrap_or_default()
        .to_string()
}
