use ledgerlink_core::{
    BreakdownType, Document, Money, NewTransaction, ReconciliationStatus, Transaction,
};

/// Fallback vendor label when a document has no extracted vendor name.
const UNKNOWN_VENDOR: &str = "Vendor";

/// Default GL category per component. Subtotal entries inherit the
/// parent transaction's category instead.
fn default_category(breakdown_type: BreakdownType) -> Option<&'static str> {
    match breakdown_type {
        BreakdownType::Subtotal => None,
        BreakdownType::Tax => Some("Tax Expense"),
        BreakdownType::Fee => Some("Fees & Charges"),
        BreakdownType::Shipping => Some("Shipping & Delivery"),
    }
}

/// Extraction confidence heuristic per component. Tax lines are labeled
/// explicitly on receipts more often than the rest.
fn default_confidence(breakdown_type: BreakdownType) -> f32 {
    match breakdown_type {
        BreakdownType::Tax => 0.9,
        _ => 0.8,
    }
}

fn component_amount(document: &Document, breakdown_type: BreakdownType) -> Option<Money> {
    match breakdown_type {
        BreakdownType::Subtotal => document.subtotal_amount,
        BreakdownType::Tax => document.tax_amount,
        BreakdownType::Fee => document.fee_amount,
        BreakdownType::Shipping => document.shipping_amount,
    }
}

/// Itemized ledger detail for a freshly matched document: one entry per
/// amount component that is present and strictly positive. Entries are
/// additive detail under the parent transaction — the parent's amount is
/// never adjusted.
pub fn plan_breakdown(document: &Document, parent: &Transaction) -> Vec<NewTransaction> {
    let vendor = document
        .vendor_name
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(UNKNOWN_VENDOR);
    let date = document.document_date.unwrap_or(parent.date);

    BreakdownType::ALL
        .into_iter()
        .filter_map(|breakdown_type| {
            let amount = component_amount(document, breakdown_type)?;
            if !amount.is_positive() {
                return None;
            }
            Some(NewTransaction {
                job_id: parent.job_id,
                original_description: format!("{vendor} - {}", breakdown_type.label()),
                amount,
                date,
                category: match breakdown_type {
                    BreakdownType::Subtotal => parent.category.clone(),
                    other => default_category(other).map(String::from),
                },
                subcategory: None,
                confidence_score: default_confidence(breakdown_type),
                bank_account_id: parent.bank_account_id,
                reconciliation_status: ReconciliationStatus::Matched,
                matched_document_id: Some(document.id),
                is_breakdown_entry: true,
                breakdown_type: Some(breakdown_type),
                parent_transaction_id: Some(parent.id),
                user_confirmed: false,
            })
        })
        .collect()
}
