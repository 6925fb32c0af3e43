//! Loan analysis queries over `historical_loans`.

use crate::schema::{LoanCondition as C, LoanField as F, Table, TableNamespace};

pub fn loan_summary(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    format!(
        "
            SELECT
                COUNT(*) as total_loans,
                AVG({amount}) as avg_loan_amount,
                SUM({amount}) as total_loan_amount,
                COUNT(DISTINCT {borrower}) as unique_borrowers,
                COUNT(DISTINCT grade) as unique_grades,
                MIN({amount}) as min_loan_amount,
                MAX({amount}) as max_loan_amount,
                STDDEV({amount}) as loan_amount_stddev
            FROM {table}
            WHERE {valid}
        ",
        borrower = F::BorrowerId.expr(),
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
    )
}

pub fn loan_status_distribution(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    format!(
        "
            SELECT
                loan_status,
                COUNT(*) as count,
                AVG({amount}) as avg_amount,
                SUM({amount}) as total_amount,
                ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (), 2) as percentage
            FROM {table}
            WHERE {valid} AND {status}
            GROUP BY loan_status
            ORDER BY count DESC
        ",
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
        status = C::ValidStatus.predicate(),
    )
}

pub fn grade_analysis(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    let rate = F::InterestRate.expr();
    format!(
        "
            SELECT
                grade,
                COUNT(*) as loan_count,
                AVG({amount}) as avg_loan_amount,
                SUM({amount}) as total_amount,
                AVG({rate}) as avg_interest_rate,
                AVG(annual_inc) as avg_annual_income,
                AVG(dti) as avg_debt_to_income,
                ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (), 2) as percentage
            FROM {table}
            WHERE {valid} AND {grade}
            GROUP BY grade
            ORDER BY grade
        ",
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
        grade = C::ValidGrade.predicate(),
    )
}

pub fn purpose_analysis(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    let rate = F::InterestRate.expr();
    format!(
        "
            SELECT
                purpose,
                COUNT(*) as loan_count,
                AVG({amount}) as avg_loan_amount,
                SUM({amount}) as total_amount,
                AVG({rate}) as avg_interest_rate,
                ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (), 2) as percentage
            FROM {table}
            WHERE {valid} AND {purpose}
            GROUP BY purpose
            ORDER BY loan_count DESC
        ",
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
        purpose = C::ValidPurpose.predicate(),
    )
}

pub fn state_distribution(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    let rate = F::InterestRate.expr();
    format!(
        "
            SELECT
                addr_state,
                COUNT(*) as loan_count,
                AVG({amount}) as avg_loan_amount,
                SUM({amount}) as total_amount,
                AVG({rate}) as avg_interest_rate,
                AVG(annual_inc) as avg_annual_income
            FROM {table}
            WHERE {valid} AND {state}
            GROUP BY addr_state
            ORDER BY loan_count DESC
        ",
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
        state = C::ValidState.predicate(),
    )
}

pub fn monthly_loan_trend(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    let rate = F::InterestRate.expr();
    format!(
        "
            SELECT
                issue_d as month,
                COUNT(*) as loan_count,
                SUM({amount}) as total_amount,
                AVG({amount}) as avg_amount,
                AVG({rate}) as avg_interest_rate
            FROM {table}
            WHERE {valid}
                AND {recent}
            GROUP BY issue_d
            ORDER BY issue_d
            LIMIT 50
        ",
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
        recent = C::RecentLoans.predicate(),
    )
}

pub fn risk_analysis(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    let rate = F::InterestRate.expr();
    format!(
        "
            SELECT
                grade,
                loan_status,
                COUNT(*) as loan_count,
                AVG({amount}) as avg_loan_amount,
                AVG({rate}) as avg_interest_rate,
                AVG(dti) as avg_debt_to_income,
                ROUND(COUNT(*) * 100.0 / SUM(COUNT(*)) OVER (PARTITION BY grade), 2) as status_percentage_in_grade
            FROM {table}
            WHERE {valid}
                AND {grade}
                AND {status}
            GROUP BY grade, loan_status
            ORDER BY grade, loan_count DESC
        ",
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
        grade = C::ValidGrade.predicate(),
        status = C::ValidStatus.predicate(),
    )
}

pub fn employment_analysis(ns: &TableNamespace) -> String {
    let amount = F::LoanAmount.expr();
    let rate = F::InterestRate.expr();
    format!(
        "
            SELECT
                CASE
                    WHEN emp_length = '< 1 year' THEN '< 1 year'
                    WHEN emp_length = '1 year' THEN '1 year'
                    WHEN emp_length IN ('2 years', '3 years', '4 years') THEN '2-4 years'
                    WHEN emp_length IN ('5 years', '6 years', '7 years', '8 years', '9 years') THEN '5-9 years'
                    WHEN emp_length = '10+ years' THEN '10+ years'
                    ELSE 'Unknown'
                END as emp_length_group,
                COUNT(*) as loan_count,
                AVG({amount}) as avg_loan_amount,
                AVG(annual_inc) as avg_annual_income,
                AVG({rate}) as avg_interest_rate,
                AVG(dti) as avg_debt_to_income
            FROM {table}
            WHERE {valid}
            GROUP BY emp_length_group
            ORDER BY
                CASE emp_length_group
                    WHEN '< 1 year' THEN 1
                    WHEN '1 year' THEN 2
                    WHEN '2-4 years' THEN 3
                    WHEN '5-9 years' THEN 4
                    WHEN '10+ years' THEN 5
                    ELSE 6
                END
        ",
        table = ns.qualify(Table::HistoricalLoans),
        valid = C::ValidLoans.predicate(),
    )
}
