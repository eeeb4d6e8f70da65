//! Query inputs: location and case identifiers, credentials and the raw
//! batch entry shape accepted on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const LOCATION_LEN: usize = 3;
const MAX_CASE_NUMBER_LEN: usize = 20;

/// Consular post code, e.g. `BEJ`. Always three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationCode(String);

impl LocationCode {
    /// Normalizes (trim + uppercase) and validates a location code.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLocation`] unless the input is exactly
    /// three ASCII letters.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let code = raw.trim().to_ascii_uppercase();
        if code.len() == LOCATION_LEN && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Self(code))
        } else {
            Err(ValidationError::InvalidLocation(raw.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application ID or case number as printed on the applicant's paperwork.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseNumber(String);

impl CaseNumber {
    /// Normalizes (trim + uppercase) and validates a case number.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCaseNumber`] for empty, over-long or
    /// non-alphanumeric input.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let case = raw.trim().to_ascii_uppercase();
        if !case.is_empty()
            && case.len() <= MAX_CASE_NUMBER_LEN
            && case.chars().all(|c| c.is_ascii_alphanumeric())
        {
            Ok(Self(case))
        } else {
            Err(ValidationError::InvalidCaseNumber(raw.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secondary identifiers required by newer portal revisions.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub passport_number: String,
    pub surname: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("passport_number", &"[redacted]")
            .field("surname", &"[redacted]")
            .finish()
    }
}

/// How (and whether) a query carries secondary identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryCredentials {
    /// Location and case number only.
    None,
    Plain(Credentials),
    /// Base64 ciphertext that decrypts to `"passport_number,surname"`.
    Encrypted(String),
}

/// A validated query, immutable for the lifetime of one retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub location: LocationCode,
    pub case_number: CaseNumber,
    pub credentials: QueryCredentials,
}

impl QueryRequest {
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if either identifier is malformed.
    pub fn new(
        location: &str,
        case_number: &str,
        credentials: QueryCredentials,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            location: LocationCode::parse(location)?,
            case_number: CaseNumber::parse(case_number)?,
            credentials,
        })
    }
}

/// A query whose credentials have been decrypted, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub location: LocationCode,
    pub case_number: CaseNumber,
    pub credentials: Option<Credentials>,
}

/// One element of the inbound batch array.
///
/// On the wire this is a JSON array of strings:
/// - `[location, case_no]`
/// - `[location, case_no, encrypted_info]`
/// - `[location, case_no, passport_number, surname]`
///
/// Identifiers are kept exactly as received; `case_number` is the key the
/// caller will look the result up under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct BatchEntry {
    pub location: String,
    pub case_number: String,
    pub credentials: QueryCredentials,
}

impl BatchEntry {
    /// Validates the raw identifiers into a [`QueryRequest`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if either identifier is malformed.
    pub fn to_request(&self) -> Result<QueryRequest, ValidationError> {
        QueryRequest::new(&self.location, &self.case_number, self.credentials.clone())
    }
}

impl TryFrom<Vec<String>> for BatchEntry {
    type Error = ValidationError;

    fn try_from(fields: Vec<String>) -> Result<Self, Self::Error> {
        let len = fields.len();
        let malformed = || {
            ValidationError::MalformedEntry(format!("expected 2, 3 or 4 fields, got {len}"))
        };

        let mut it = fields.into_iter();
        let (Some(location), Some(case_number)) = (it.next(), it.next()) else {
            return Err(malformed());
        };
        let credentials = match (it.next(), it.next(), it.next()) {
            (None, _, _) => QueryCredentials::None,
            (Some(info), None, _) => QueryCredentials::Encrypted(info),
            (Some(passport_number), Some(surname), None) => QueryCredentials::Plain(Credentials {
                passport_number,
                surname,
            }),
            (Some(_), Some(_), Some(_)) => return Err(malformed()),
        };

        Ok(Self {
            location,
            case_number,
            credentials,
        })
    }
}

impl From<BatchEntry> for Vec<String> {
    fn from(entry: BatchEntry) -> Self {
        let mut fields = vec![entry.location, entry.case_number];
        match entry.credentials {
            QueryCredentials::None => {}
            QueryCredentials::Encrypted(info) => fields.push(info),
            QueryCredentials::Plain(c) => {
                fields.push(c.passport_number);
                fields.push(c.surname);
            }
        }
        fields
    }
}
