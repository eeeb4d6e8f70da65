//! Session field extraction and postback form assembly.
//!
//! The status page is an ASP.NET WebForms page: every request must echo the
//! hidden inputs (view state, event validation, ...) of the page it was
//! served, plus a fixed set of postback fields identifying the submit button.

use std::collections::BTreeMap;

use ceac_core::ResolvedQuery;
use scraper::{Html, Selector};

use crate::error::PortalError;

pub(crate) const CAPTCHA_IMAGE_ID: &str =
    "c_status_ctl00_contentplaceholder1_defaultcaptcha_CaptchaImage";

pub(crate) const FIELD_CAPTCHA: &str = "ctl00$ContentPlaceHolder1$Captcha";
pub(crate) const FIELD_LOCATION: &str = "ctl00$ContentPlaceHolder1$Location_Dropdown";
pub(crate) const FIELD_CASE_NUMBER: &str = "ctl00$ContentPlaceHolder1$Visa_Case_Number";
pub(crate) const FIELD_PASSPORT_NUMBER: &str = "ctl00$ContentPlaceHolder1$Passport_Number";
pub(crate) const FIELD_SURNAME: &str = "ctl00$ContentPlaceHolder1$Surname";

/// Postback fields the portal expects on every submission.
const STATIC_FIELDS: [(&str, &str); 7] = [
    (
        "ctl00_ToolkitScriptManager1_HiddenField",
        ";;AjaxControlToolkit, Version=3.5.51116.0, Culture=neutral, \
         PublicKeyToken=28f01b0e84b6d53e:en-US:2a06c7e2-728e-4b15-83d6-9b269fb7261e:\
         de1feab2:f2c8e708:8613aea7:f9cec9bc:3202a5a2:a67c2700:720a52bf:589eaa30:\
         ab09e3fe:87104b7c:be6fb298",
    ),
    ("ctl00$ContentPlaceHolder1$Visa_Application_Type", "NIV"),
    ("__EVENTTARGET", "ctl00$ContentPlaceHolder1$btnSubmit"),
    (
        "ctl00$ToolkitScriptManager1",
        "ctl00$ContentPlaceHolder1$UpdatePanel1|ctl00$ContentPlaceHolder1$btnSubmit",
    ),
    (
        "LBD_BackWorkaround_c_status_ctl00_contentplaceholder1_defaultcaptcha",
        "1",
    ),
    ("__EVENTARGUMENT", ""),
    ("__LASTFOCUS", ""),
];

/// Hidden form state and captcha reference of one served page.
///
/// A session document may back at most one submission; the retry loop moves
/// it into the attempt that consumes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDocument {
    fields: BTreeMap<String, String>,
    captcha_image_ref: String,
}

impl SessionDocument {
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// The captcha `src` attribute exactly as it appeared in the page.
    #[must_use]
    pub fn captcha_image_ref(&self) -> &str {
        &self.captcha_image_ref
    }
}

pub(crate) fn selector(css: &str) -> Result<Selector, PortalError> {
    Selector::parse(css).map_err(|e| PortalError::MalformedPage {
        reason: format!("invalid selector {css:?}: {e:?}"),
    })
}

/// Collects every named hidden input and the captcha image reference.
///
/// Inputs without a `name` are skipped; a missing `value` counts as empty.
/// When a name repeats, the last occurrence wins.
///
/// # Errors
///
/// Returns [`PortalError::MalformedPage`] if the captcha image element or its
/// `src` attribute is absent.
pub fn extract(html: &str) -> Result<SessionDocument, PortalError> {
    let document = Html::parse_document(html);

    let hidden = selector(r#"input[type="hidden"]"#)?;
    let mut fields = BTreeMap::new();
    for input in document.select(&hidden) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        let value = input.value().attr("value").unwrap_or_default();
        fields.insert(name.to_string(), value.to_string());
    }

    let captcha = selector(&format!("#{CAPTCHA_IMAGE_ID}"))?;
    let captcha_image_ref = document
        .select(&captcha)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .ok_or_else(|| PortalError::MalformedPage {
            reason: format!("captcha image #{CAPTCHA_IMAGE_ID} with a src attribute not found"),
        })?
        .to_string();

    Ok(SessionDocument {
        fields,
        captcha_image_ref,
    })
}

/// Overlays the postback constants, the captcha guess and the query
/// identifiers onto the session's hidden fields.
///
/// Passport and surname fields are only sent when credentials are present.
#[must_use]
pub fn build_submission(
    session: &SessionDocument,
    query: &ResolvedQuery,
    captcha_guess: &str,
) -> BTreeMap<String, String> {
    let mut form = session.fields.clone();
    for (name, value) in STATIC_FIELDS {
        form.insert(name.to_string(), value.to_string());
    }
    form.insert(FIELD_CAPTCHA.to_string(), captcha_guess.to_string());
    form.insert(
        FIELD_LOCATION.to_string(),
        query.location.as_str().to_string(),
    );
    form.insert(
        FIELD_CASE_NUMBER.to_string(),
        query.case_number.as_str().to_string(),
    );
    if let Some(credentials) = &query.credentials {
        form.insert(
            FIELD_PASSPORT_NUMBER.to_string(),
            credentials.passport_number.clone(),
        );
        form.insert(FIELD_SURNAME.to_string(), credentials.surname.clone());
    }
    form
}
