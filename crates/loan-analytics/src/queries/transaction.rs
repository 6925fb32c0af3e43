//! Accounting transaction queries over `raw_transactions`.
//!
//! `raw_transactions` holds accounting balances, not loan records.

use crate::schema::{Table, TableNamespace, TransactionCondition as C, TransactionField as F};

pub fn transaction_summary(ns: &TableNamespace) -> String {
    let balance = F::Balance.expr();
    format!(
        "
            SELECT
                COUNT(*) as total_transactions,
                COUNT(DISTINCT accounting_treatment_id) as unique_treatments,
                AVG({balance}) as avg_balance,
                SUM({balance}) as total_balance,
                COUNT(DISTINCT status) as unique_statuses,
                COUNT(DISTINCT type) as unique_types,
                COUNT(DISTINCT purpose) as unique_purposes
            FROM {table}
            WHERE {nonzero}
        ",
        table = ns.qualify(Table::RawTransactions),
        nonzero = C::NonZeroBalance.predicate(),
    )
}

pub fn transaction_by_status(ns: &TableNamespace) -> String {
    let balance = F::Balance.expr();
    format!(
        "
            SELECT
                COALESCE(status, 'Unknown') as transaction_status,
                COUNT(*) as transaction_count,
                AVG({balance}) as avg_balance,
                SUM({balance}) as total_balance,
                AVG({interest}) as avg_accrued_interest,
                ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (), 2) as percentage
            FROM {table}
            WHERE {nonzero}
            GROUP BY status
            ORDER BY transaction_count DESC
        ",
        interest = F::Interest.expr(),
        table = ns.qualify(Table::RawTransactions),
        nonzero = C::NonZeroBalance.predicate(),
    )
}

pub fn transaction_by_purpose(ns: &TableNamespace) -> String {
    let balance = F::Balance.expr();
    format!(
        "
            SELECT
                COALESCE(purpose, 'Unknown') as transaction_purpose,
                COUNT(*) as transaction_count,
                AVG({balance}) as avg_balance,
                SUM({balance}) as total_balance,
                AVG({interest}) as avg_accrued_interest,
                ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (), 2) as percentage
            FROM {table}
            WHERE {nonzero} AND {purpose}
            GROUP BY purpose
            ORDER BY transaction_count DESC
        ",
        interest = F::Interest.expr(),
        table = ns.qualify(Table::RawTransactions),
        nonzero = C::NonZeroBalance.predicate(),
        purpose = C::PresentPurpose.predicate(),
    )
}

pub fn payment_analysis(ns: &TableNamespace) -> String {
    let balance = F::Balance.expr();
    let interest = F::Interest.expr();
    format!(
        "
            SELECT
                COALESCE(type, 'Unknown') as transaction_type,
                COUNT(*) as transaction_count,
                AVG({balance}) as avg_balance,
                SUM({balance}) as total_balance,
                AVG({interest}) as avg_accrued_interest,
                SUM({interest}) as total_accrued_interest,
                AVG({arrears}) as avg_arrears,
                COUNT(DISTINCT accounting_treatment_id) as unique_treatments
            FROM {table}
            WHERE {nonzero}
            GROUP BY type
            ORDER BY total_balance DESC
        ",
        arrears = F::Arrears.expr(),
        table = ns.qualify(Table::RawTransactions),
        nonzero = C::NonZeroBalance.predicate(),
    )
}
