//! Submission decoding: turning a `{form_data, skip}` pair into a user turn.

use parley_core::turn::{Turn, TurnKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Submitted form fields.
pub type FormData = BTreeMap<String, String>;

/// One user submission as it arrives from the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub form_data: FormData,

    /// The user dismissed a pending inquiry
    #[serde(default)]
    pub skip: bool,
}

impl Submission {
    /// Free-form input.
    pub fn input(text: impl Into<String>) -> Self {
        Self::from_fields([("input", text.into())])
    }

    /// A picked related query.
    pub fn related(query: impl Into<String>) -> Self {
        Self::from_fields([("related_query", query.into())])
    }

    /// The user dismissed the last inquiry.
    pub fn skip() -> Self {
        Self {
            form_data: FormData::new(),
            skip: true,
        }
    }

    pub fn from_fields<K: Into<String>>(fields: impl IntoIterator<Item = (K, String)>) -> Self {
        Self {
            form_data: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            skip: false,
        }
    }

    /// The kind a user turn for this submission carries.
    pub fn kind(&self) -> Option<TurnKind> {
        if self.skip {
            None
        } else if self.form_data.contains_key("input") {
            Some(TurnKind::Input)
        } else if self.form_data.contains_key("related_query") {
            Some(TurnKind::InputRelated)
        } else {
            Some(TurnKind::Inquiry)
        }
    }

    /// The user turn to append, or `None` for an empty non-skip submission.
    pub fn user_turn(&self) -> Result<Option<Turn>, serde_json::Error> {
        if self.skip {
            let content = serde_json::json!({ "action": "skip" }).to_string();
            return Ok(Some(Turn::user(content, None)));
        }
        if self.form_data.is_empty() {
            return Ok(None);
        }
        let content = serde_json::to_string(&self.form_data)?;
        Ok(Some(Turn::user(content, self.kind())))
    }
}
