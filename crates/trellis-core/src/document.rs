// crates/trellis-core/src/document.rs
//
// IdentityDocument: the JSON form in which an identity is published to, and
// fetched from, the content-addressed network.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::TrellisError;
use crate::trust::TrustValue;
use crate::uri::RequestUri;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

/// A published trust value, addressed by the trustee's request URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTrust {
    pub trustee: RequestUri,
    pub value: TrustValue,
    pub comment: String,
}

/// Published state of one identity at one edition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityDocument {
    pub version: u32,
    /// Request URI of the publisher, carrying the published edition.
    pub request_uri: RequestUri,
    pub nickname: Option<String>,
    pub publishes_trust_list: bool,
    pub contexts: BTreeSet<String>,
    pub properties: BTreeMap<String, String>,
    /// Empty unless `publishes_trust_list` is set.
    #[serde(default)]
    pub trust_list: Vec<DocumentTrust>,
}

impl IdentityDocument {
    pub fn edition(&self) -> u64 {
        self.request_uri.edition()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TrellisError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a fetched document, rejecting versions this node does not know.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrellisError> {
        let document: IdentityDocument = serde_json::from_slice(bytes)?;
        if document.version != DOCUMENT_VERSION {
            return Err(TrellisError::Serialization(format!(
                "unsupported identity document version {}",
                document.version
            )));
        }
        if !document.publishes_trust_list && !document.trust_list.is_empty() {
            return Err(TrellisError::Serialization(
                "document carries a trust list but does not publish one".to_string(),
            ));
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::InsertUri;

    fn sample() -> IdentityDocument {
        IdentityDocument {
            version: DOCUMENT_VERSION,
            request_uri: InsertUri::generate().request_uri().with_edition(4),
            nickname: Some("alice".to_string()),
            publishes_trust_list: true,
            contexts: ["Introduction".to_string()].into_iter().collect(),
            properties: BTreeMap::new(),
            trust_list: vec![DocumentTrust {
                trustee: InsertUri::generate().request_uri(),
                value: TrustValue::try_from(75).unwrap(),
                comment: "met in person".to_string(),
            }],
        }
    }

    #[test]
    fn document_bytes_parse_back() {
        let doc = sample();
        let parsed = IdentityDocument::from_bytes(&doc.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.edition(), 4);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut doc = sample();
        doc.version = 99;
        let err = IdentityDocument::from_bytes(&doc.to_bytes().unwrap()).unwrap_err();
        assert!(matches!(err, TrellisError::Serialization(_)));
    }

    #[test]
    fn hidden_trust_list_must_be_empty() {
        let mut doc = sample();
        doc.publishes_trust_list = false;
        assert!(IdentityDocument::from_bytes(&doc.to_bytes().unwrap()).is_err());
    }

    #[test]
    fn garbage_is_a_serialization_error() {
        assert!(matches!(
            IdentityDocument::from_bytes(b"<identity/>"),
            Err(TrellisError::Serialization(_))
        ));
    }
}
