use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::request::{line_items_total, FundId, LineItem};

pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_ATTACHMENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/heic",
    "application/pdf",
];

/// Line item as entered by the submitter, before normalization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentInput {
    pub url: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionDraft {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub payee: String,
    #[serde(default)]
    pub fund_id: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub line_items: Vec<LineItemInput>,
    /// Total as computed by the client. Never trusted.
    #[serde(default)]
    pub claimed_amount: Option<i64>,
    #[serde(default)]
    pub attachment: Option<AttachmentInput>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedSubmission {
    pub organization: String,
    pub title: String,
    pub payee: String,
    pub fund_id: FundId,
    pub reason: String,
    pub line_items: Vec<LineItem>,
    pub amount: i64,
    pub attachment_url: Option<String>,
}

/// Field name to message, one message per field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionErrors {
    pub fields: BTreeMap<String, String>,
}

impl SubmissionErrors {
    fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

impl fmt::Display for SubmissionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> =
            self.fields.iter().map(|(field, message)| format!("{field}: {message}")).collect();
        f.write_str(&joined.join("; "))
    }
}

fn required(value: &str, field: &str, errors: &mut SubmissionErrors) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.insert(field, format!("{field} is required"));
    }
    trimmed.to_string()
}

pub fn validate_submission(
    draft: &SubmissionDraft,
) -> Result<ValidatedSubmission, SubmissionErrors> {
    let mut errors = SubmissionErrors::default();

    let organization = required(&draft.organization, "organization", &mut errors);
    let title = required(&draft.title, "title", &mut errors);
    let payee = required(&draft.payee, "payee", &mut errors);
    let fund_id = required(&draft.fund_id, "fund_id", &mut errors);
    let reason = required(&draft.reason, "reason", &mut errors);

    let named: Vec<&LineItemInput> =
        draft.line_items.iter().filter(|item| !item.name.trim().is_empty()).collect();
    if named.is_empty() {
        errors.insert("line_items", "at least one line item is required");
    }

    let mut line_items = Vec::with_capacity(named.len());
    for item in named {
        let name = item.name.trim();
        if item.quantity <= 0 || item.unit_price <= 0 {
            errors.insert(
                "line_items",
                format!("line item `{name}` needs a positive quantity and unit price"),
            );
            continue;
        }
        match LineItem::priced(name, item.quantity, item.unit_price) {
            Some(line) => line_items.push(line),
            None => errors.insert("amount", format!("line item `{name}` amount is too large")),
        }
    }

    let amount = match line_items_total(&line_items) {
        Some(total) => total,
        None => {
            errors.insert("amount", "request total is too large");
            0
        }
    };
    if amount <= 0 && errors.get("line_items").is_none() {
        errors.insert("amount", "request total must be greater than zero");
    }

    if let Some(attachment) = &draft.attachment {
        if !ALLOWED_ATTACHMENT_TYPES.contains(&attachment.content_type.as_str()) {
            errors.insert(
                "attachment",
                "only images (JPEG, PNG, GIF, WebP, HEIC) or PDF files are accepted",
            );
        } else if attachment.size_bytes > MAX_ATTACHMENT_BYTES {
            errors.insert("attachment", "attachments must be 10MB or smaller");
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ValidatedSubmission {
        organization,
        title,
        payee,
        fund_id: FundId(fund_id),
        reason,
        line_items,
        amount,
        attachment_url: draft.attachment.as_ref().map(|attachment| attachment.url.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::{validate_submission, AttachmentInput, LineItemInput, SubmissionDraft};

    fn item(name: &str, quantity: i64, unit_price: i64) -> LineItemInput {
        LineItemInput { name: name.to_string(), quantity, unit_price }
    }

    fn draft() -> SubmissionDraft {
        SubmissionDraft {
            organization: "Volleyball club".to_string(),
            title: "New equipment".to_string(),
            payee: "Sports shop".to_string(),
            fund_id: "fund-club-2026".to_string(),
            reason: "Worn out nets".to_string(),
            line_items: vec![item("ball", 2, 500), item("net", 1, 3000)],
            claimed_amount: None,
            attachment: None,
        }
    }

    #[test]
    fn total_is_recomputed_and_client_amount_ignored() {
        let mut draft = draft();
        draft.claimed_amount = Some(9999);

        let validated = validate_submission(&draft).expect("valid draft");
        assert_eq!(validated.amount, 4000);
        assert_eq!(validated.line_items[0].amount, 1000);
        assert_eq!(validated.line_items[1].amount, 3000);
    }

    #[test]
    fn blank_named_items_are_dropped() {
        let mut draft = draft();
        draft.line_items.push(item("   ", 0, 0));

        let validated = validate_submission(&draft).expect("blank rows are ignored");
        assert_eq!(validated.line_items.len(), 2);
    }

    #[test]
    fn missing_fields_are_reported_per_field() {
        let mut draft = draft();
        draft.title = "  ".to_string();
        draft.payee.clear();

        let errors = validate_submission(&draft).expect_err("missing fields");
        assert!(errors.get("title").is_some());
        assert!(errors.get("payee").is_some());
        assert!(errors.get("organization").is_none());
    }

    #[test]
    fn items_need_positive_quantity_and_price() {
        let mut draft = draft();
        draft.line_items = vec![item("chalk", 0, 120)];

        let errors = validate_submission(&draft).expect_err("zero quantity");
        assert!(errors.get("line_items").is_some_and(|message| message.contains("chalk")));
    }

    #[test]
    fn at_least_one_named_item_is_required() {
        let mut draft = draft();
        draft.line_items = vec![item("", 1, 100)];

        let errors = validate_submission(&draft).expect_err("no items");
        assert_eq!(errors.get("line_items"), Some("at least one line item is required"));
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let mut draft = draft();
        draft.line_items = vec![item("a", i64::MAX, 1), item("b", 1, 1)];

        let errors = validate_submission(&draft).expect_err("overflow");
        assert!(errors.get("amount").is_some());
    }

    #[test]
    fn attachment_type_and_size_are_checked() {
        let mut draft = draft();
        draft.attachment = Some(AttachmentInput {
            url: "uploads/receipt.exe".to_string(),
            content_type: "application/x-msdownload".to_string(),
            size_bytes: 10,
        });
        assert!(validate_submission(&draft).expect_err("bad type").get("attachment").is_some());

        draft.attachment = Some(AttachmentInput {
            url: "uploads/receipt.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 11 * 1024 * 1024,
        });
        assert!(validate_submission(&draft).expect_err("too big").get("attachment").is_some());

        draft.attachment = Some(AttachmentInput {
            url: "uploads/receipt.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 2048,
        });
        let validated = validate_submission(&draft).expect("pdf under limit");
        assert_eq!(validated.attachment_url.as_deref(), Some("uploads/receipt.pdf"));
    }
}
