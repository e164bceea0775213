//! Request context for a document run

use crate::error::{Error, Result};
use crate::report::{Person, PersonKind};

/// Everything a document request carries: who asks, who it is about, where,
/// and why. Validated at construction so the services can rely on it.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    pub requestor: Person,
    pub requested_people: Vec<Person>,
    pub municipality: String,
    pub purpose: String,
}

impl DocumentContext {
    pub fn new(
        requestor: Person,
        requested_people: Vec<Person>,
        municipality: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Result<Self> {
        let municipality = municipality.into().trim().to_string();
        let purpose = purpose.into().trim().to_string();

        if municipality.is_empty() {
            return Err(Error::InvalidInput {
                message: "municipality must not be empty".to_string(),
            });
        }
        if purpose.is_empty() {
            return Err(Error::InvalidInput {
                message: "purpose must not be empty".to_string(),
            });
        }
        if requestor.kind != PersonKind::Requestor {
            return Err(Error::InvalidInput {
                message: "requestor must have type 'requestor'".to_string(),
            });
        }

        Ok(Self {
            requestor,
            requested_people,
            municipality,
            purpose,
        })
    }

    /// Every person in the request: the requestor first, then the requested
    /// people in order.
    pub fn all_people(&self) -> Vec<&Person> {
        std::iter::once(&self.requestor)
            .chain(self.requested_people.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn requestor() -> Person {
        Person::new("Hans", "Muster", PersonKind::Requestor)
    }

    #[test]
    fn test_valid_context() {
        let ctx = DocumentContext::new(
            requestor(),
            vec![Person::new("Anna", "Beispiel", PersonKind::Requested)],
            "Zürich",
            "Inheritance proceedings",
        )
        .unwrap();

        assert_eq!(ctx.municipality, "Zürich");
        assert_eq!(ctx.all_people().len(), 2);
        assert_eq!(ctx.all_people()[0].full_name(), "Hans Muster");
    }

    #[test]
    fn test_empty_municipality_rejected() {
        let err = DocumentContext::new(requestor(), vec![], "   ", "Purpose").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(err.to_string().contains("municipality"));
    }

    #[test]
    fn test_empty_purpose_rejected() {
        let err = DocumentContext::new(requestor(), vec![], "Zürich", "").unwrap_err();
        assert!(err.to_string().contains("purpose"));
    }

    #[test]
    fn test_wrong_requestor_kind_rejected() {
        let not_requestor = Person::new("Hans", "Muster", PersonKind::Requested);
        let err = DocumentContext::new(not_requestor, vec![], "Zürich", "Purpose").unwrap_err();
        assert!(err.to_string().contains("requestor"));
    }
}
