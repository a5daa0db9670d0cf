//! Form state capture for the portal's ASP.NET WebForms pages.
//!
//! WebForms keeps its session state in hidden fields (`__VIEWSTATE` and
//! friends), so every postback has to send back the complete field set of the
//! page it was issued from.

use std::sync::LazyLock;

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

static INPUT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("input").unwrap());
static SELECTED_OPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("select option[selected]").unwrap());

/// Field name to value, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormState(IndexMap<String, String>);

impl FormState {
    /// Sets a field, replacing the value in place if the name already exists.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Collects the values a browser would submit for the page's form: named
/// inputs (checkboxes and radios only when checked) and the selected option
/// of each named select. Missing values become `""`.
pub fn extract_form_state(html: &str) -> FormState {
    let document = Html::parse_document(html);
    let mut state = FormState::default();

    for input in document.select(&INPUT_SEL) {
        let Some(name) = input.value().attr("name").filter(|n| !n.is_empty()) else {
            continue;
        };
        let input_type = input.value().attr("type").unwrap_or("text").to_lowercase();

        if (input_type == "checkbox" || input_type == "radio")
            && input.value().attr("checked").is_none()
        {
            continue;
        }

        state.set(name, input.value().attr("value").unwrap_or(""));
    }

    for option in document.select(&SELECTED_OPTION_SEL) {
        // Options may sit inside an <optgroup>, so walk up to the select.
        let select = option
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "select");
        let Some(name) = select
            .and_then(|el| el.value().attr("name"))
            .filter(|n| !n.is_empty())
        else {
            continue;
        };

        state.set(name, option.value().attr("value").unwrap_or(""));
    }

    state
}
