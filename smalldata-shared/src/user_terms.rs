//! Per-user distinctive term documents produced by the term computation jobs.

use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentError};

/// A distinctive term and its score for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermScore {
    pub key: String,
    pub score: f64,
}

/// One user's output record: identity, activity count and top terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTermsDocument {
    pub user_id: i64,
    pub username: String,
    pub num_comments: i64,
    /// Terms ordered by descending score.
    pub terms: Vec<TermScore>,
}

impl UserTermsDocument {
    pub fn new(user_id: i64, username: impl Into<String>, num_comments: i64) -> Self {
        Self {
            user_id,
            username: username.into(),
            num_comments,
            terms: Vec::new(),
        }
    }

    pub fn with_term(mut self, key: impl Into<String>, score: f64) -> Self {
        self.terms.push(TermScore {
            key: key.into(),
            score,
        });
        self
    }
}

impl TryFrom<&UserTermsDocument> for Document {
    type Error = DocumentError;

    fn try_from(doc: &UserTermsDocument) -> Result<Self, Self::Error> {
        Document::from_serializable(doc.user_id.to_string(), doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_user_terms_into_document() {
        let user = UserTermsDocument::new(42, "alice", 17)
            .with_term("rust", 3.5)
            .with_term("borrow", 1.25);

        let doc = Document::try_from(&user).unwrap();
        let body: Value = serde_json::from_str(doc.source()).unwrap();

        assert_eq!(doc.id(), "42");
        assert_eq!(body["username"], "alice");
        assert_eq!(body["num_comments"], 17);
        assert_eq!(body["terms"][0]["key"], "rust");
        assert_eq!(body["terms"][1]["score"], 1.25);
    }
}
