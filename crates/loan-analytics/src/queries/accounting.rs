//! Accounting treatment queries. Balances and interest are coalesced to `'0'`
//! before casting so blank strings never reach the aggregates.

use crate::schema::{Table, TableNamespace, TransactionCondition as C};

const BALANCE: &str = "CAST(COALESCE(balance, '0') AS DOUBLE)";
const INTEREST: &str = "CAST(COALESCE(accrued_interest, '0') AS DOUBLE)";

pub fn accounting_treatment_analysis(ns: &TableNamespace) -> String {
    format!(
        "
            SELECT
                COALESCE(ra.accounting_treatment, 'Unknown') as treatment_type,
                COUNT(rt.id) as transaction_count,
                SUM(CAST(COALESCE(rt.balance, '0') AS DOUBLE)) as total_balance,
                AVG(CAST(COALESCE(rt.balance, '0') AS DOUBLE)) as avg_balance,
                SUM(CAST(COALESCE(rt.accrued_interest, '0') AS DOUBLE)) as total_accrued_interest,
                AVG(CAST(COALESCE(rt.accrued_interest, '0') AS DOUBLE)) as avg_accrued_interest
            FROM {transactions} rt
            LEFT JOIN {lookup} ra
                ON CAST(rt.accounting_treatment_id AS LONG) = ra.id
            WHERE rt.balance IS NOT NULL AND rt.balance != ''
            GROUP BY ra.accounting_treatment
            ORDER BY total_balance DESC
        ",
        transactions = ns.qualify(Table::RawTransactions),
        lookup = ns.qualify(Table::RefAccounting),
    )
}

pub fn balance_analysis(ns: &TableNamespace) -> String {
    format!(
        "
            SELECT
                COALESCE(type, 'Unknown') as transaction_type,
                COALESCE(status, 'Unknown') as transaction_status,
                COUNT(*) as transaction_count,
                SUM({BALANCE}) as total_balance,
                AVG({BALANCE}) as avg_balance,
                MIN({BALANCE}) as min_balance,
                MAX({BALANCE}) as max_balance
            FROM {table}
            WHERE {present}
            GROUP BY type, status
            ORDER BY total_balance DESC
        ",
        table = ns.qualify(Table::RawTransactions),
        present = C::PresentBalance.predicate(),
    )
}

pub fn accounting_by_state(ns: &TableNamespace) -> String {
    format!(
        "
            SELECT
                COALESCE(state_code, 'Unknown') as state_code,
                COUNT(*) as transaction_count,
                SUM({BALANCE}) as total_balance,
                AVG({BALANCE}) as avg_balance,
                SUM({INTEREST}) as total_accrued_interest,
                COUNT(DISTINCT type) as transaction_types
            FROM {table}
            WHERE {present} AND {state}
            GROUP BY state_code
            ORDER BY total_balance DESC
        ",
        table = ns.qualify(Table::RawTransactions),
        present = C::PresentBalance.predicate(),
        state = C::PresentState.predicate(),
    )
}

pub fn interest_analysis(ns: &TableNamespace) -> String {
    format!(
        "
            SELECT
                COALESCE(type, 'Unknown') as transaction_type,
                COUNT(*) as transaction_count,
                SUM({INTEREST}) as total_accrued_interest,
                AVG({INTEREST}) as avg_accrued_interest,
                SUM({BALANCE}) as total_balance,
                CASE
                    WHEN SUM({BALANCE}) > 0
                    THEN SUM({INTEREST}) / SUM({BALANCE}) * 100
                    ELSE 0
                END as interest_to_balance_ratio
            FROM {table}
            WHERE {interest_present}
                AND {balance_present}
            GROUP BY type
            ORDER BY total_accrued_interest DESC
        ",
        table = ns.qualify(Table::RawTransactions),
        interest_present = C::PresentInterest.predicate(),
        balance_present = C::PresentBalance.predicate(),
    )
}
