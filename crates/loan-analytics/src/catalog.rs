//! Query catalog: symbolic query names and their SQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::queries::{accounting, loan, transaction};
use crate::schema::{Table, TableNamespace};
use crate::types::{AnalyticsError, AnalyticsResult};

/// Which group a query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Loan,
    Transaction,
    Accounting,
}

/// Every predefined query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryName {
    LoanSummary,
    LoanStatusDistribution,
    GradeAnalysis,
    PurposeAnalysis,
    StateDistribution,
    MonthlyLoanTrend,
    RiskAnalysis,
    EmploymentAnalysis,

    TransactionSummary,
    TransactionByStatus,
    TransactionByPurpose,
    PaymentAnalysis,

    AccountingTreatmentAnalysis,
    BalanceAnalysis,
    AccountingByState,
    InterestAnalysis,
}

/// Older names kept resolvable for existing links and scripts.
pub const LEGACY_ALIASES: &[(&str, QueryName)] = &[
    ("overview", QueryName::LoanSummary),
    ("loan_status", QueryName::LoanStatusDistribution),
    ("monthly_trends", QueryName::MonthlyLoanTrend),
    ("transactions", QueryName::TransactionSummary),
    ("accounting", QueryName::AccountingTreatmentAnalysis),
];

impl QueryName {
    /// Registration order: loan, transaction, accounting.
    pub const ALL: [QueryName; 16] = [
        QueryName::LoanSummary,
        QueryName::LoanStatusDistribution,
        QueryName::GradeAnalysis,
        QueryName::PurposeAnalysis,
        QueryName::StateDistribution,
        QueryName::MonthlyLoanTrend,
        QueryName::RiskAnalysis,
        QueryName::EmploymentAnalysis,
        QueryName::TransactionSummary,
        QueryName::TransactionByStatus,
        QueryName::TransactionByPurpose,
        QueryName::PaymentAnalysis,
        QueryName::AccountingTreatmentAnalysis,
        QueryName::BalanceAnalysis,
        QueryName::AccountingByState,
        QueryName::InterestAnalysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryName::LoanSummary => "loan_summary",
            QueryName::LoanStatusDistribution => "loan_status_distribution",
            QueryName::GradeAnalysis => "grade_analysis",
            QueryName::PurposeAnalysis => "purpose_analysis",
            QueryName::StateDistribution => "state_distribution",
            QueryName::MonthlyLoanTrend => "monthly_loan_trend",
            QueryName::RiskAnalysis => "risk_analysis",
            QueryName::EmploymentAnalysis => "employment_analysis",
            QueryName::TransactionSummary => "transaction_summary",
            QueryName::TransactionByStatus => "transaction_by_status",
            QueryName::TransactionByPurpose => "transaction_by_purpose",
            QueryName::PaymentAnalysis => "payment_analysis",
            QueryName::AccountingTreatmentAnalysis => "accounting_treatment_analysis",
            QueryName::BalanceAnalysis => "balance_analysis",
            QueryName::AccountingByState => "accounting_by_state",
            QueryName::InterestAnalysis => "interest_analysis",
        }
    }

    /// Human description shown in pickers and listings.
    pub fn description(self) -> &'static str {
        match self {
            QueryName::LoanSummary => "Overall loan portfolio summary with key metrics",
            QueryName::LoanStatusDistribution => "Distribution of loans by status",
            QueryName::GradeAnalysis => "Analysis by loan grade (A-G)",
            QueryName::PurposeAnalysis => "Analysis by loan purpose",
            QueryName::StateDistribution => "Geographic distribution by state",
            QueryName::MonthlyLoanTrend => "Monthly loan origination trends",
            QueryName::RiskAnalysis => "Risk analysis by grade and status",
            QueryName::EmploymentAnalysis => "Analysis by employment length",
            QueryName::TransactionSummary => "Overall accounting transaction summary",
            QueryName::TransactionByStatus => "Accounting transactions by status",
            QueryName::TransactionByPurpose => "Accounting transactions by purpose",
            QueryName::PaymentAnalysis => "Accounting analysis by transaction type",
            QueryName::AccountingTreatmentAnalysis => {
                "Accounting treatment analysis with lookups"
            }
            QueryName::BalanceAnalysis => "Balance analysis by type and status",
            QueryName::AccountingByState => "Accounting transactions by state",
            QueryName::InterestAnalysis => "Accrued interest analysis",
        }
    }

    pub fn domain(self) -> Domain {
        use QueryName::*;
        match self {
            LoanSummary | LoanStatusDistribution | GradeAnalysis | PurposeAnalysis
            | StateDistribution | MonthlyLoanTrend | RiskAnalysis | EmploymentAnalysis => {
                Domain::Loan
            }
            TransactionSummary | TransactionByStatus | TransactionByPurpose | PaymentAnalysis => {
                Domain::Transaction
            }
            AccountingTreatmentAnalysis | BalanceAnalysis | AccountingByState
            | InterestAnalysis => Domain::Accounting,
        }
    }

    /// Tables the generated statement reads.
    pub fn tables(self) -> &'static [Table] {
        match self {
            QueryName::AccountingTreatmentAnalysis => {
                &[Table::RawTransactions, Table::RefAccounting]
            }
            q if q.domain() == Domain::Loan => &[Table::HistoricalLoans],
            _ => &[Table::RawTransactions],
        }
    }

    /// Generate the SQL for this query against a namespace.
    pub fn sql(self, ns: &TableNamespace) -> String {
        match self {
            QueryName::LoanSummary => loan::loan_summary(ns),
            QueryName::LoanStatusDistribution => loan::loan_status_distribution(ns),
            QueryName::GradeAnalysis => loan::grade_analysis(ns),
            QueryName::PurposeAnalysis => loan::purpose_analysis(ns),
            QueryName::StateDistribution => loan::state_distribution(ns),
            QueryName::MonthlyLoanTrend => loan::monthly_loan_trend(ns),
            QueryName::RiskAnalysis => loan::risk_analysis(ns),
            QueryName::EmploymentAnalysis => loan::employment_analysis(ns),
            QueryName::TransactionSummary => transaction::transaction_summary(ns),
            QueryName::TransactionByStatus => transaction::transaction_by_status(ns),
            QueryName::TransactionByPurpose => transaction::transaction_by_purpose(ns),
            QueryName::PaymentAnalysis => transaction::payment_analysis(ns),
            QueryName::AccountingTreatmentAnalysis => {
                accounting::accounting_treatment_analysis(ns)
            }
            QueryName::BalanceAnalysis => accounting::balance_analysis(ns),
            QueryName::AccountingByState => accounting::accounting_by_state(ns),
            QueryName::InterestAnalysis => accounting::interest_analysis(ns),
        }
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryName {
    type Err = AnalyticsError;

    /// Accepts canonical names and legacy aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        QueryName::ALL
            .into_iter()
            .find(|q| q.as_str() == name)
            .or_else(|| {
                LEGACY_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == name)
                    .map(|(_, q)| *q)
            })
            .ok_or_else(|| AnalyticsError::UnknownQueryName {
                name: name.to_string(),
                available: all_names().iter().map(|n| n.to_string()).collect(),
            })
    }
}

/// Canonical names followed by legacy aliases.
pub fn all_names() -> Vec<&'static str> {
    QueryName::ALL
        .iter()
        .map(|q| q.as_str())
        .chain(LEGACY_ALIASES.iter().map(|(alias, _)| *alias))
        .collect()
}

/// Name → SQL lookup bound to one table namespace.
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    namespace: TableNamespace,
}

impl QueryCatalog {
    pub fn new(namespace: TableNamespace) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &TableNamespace {
        &self.namespace
    }

    /// Resolve a name or alias to its query.
    pub fn lookup(&self, name: &str) -> AnalyticsResult<QueryName> {
        name.parse()
    }

    /// Resolve a name or alias to ready-to-run SQL.
    pub fn resolve(&self, name: &str) -> AnalyticsResult<String> {
        Ok(self.lookup(name)?.sql(&self.namespace))
    }

    /// Canonical queries with descriptions, in registration order.
    pub fn list_available(&self) -> Vec<(&'static str, &'static str)> {
        QueryName::ALL
            .iter()
            .map(|q| (q.as_str(), q.description()))
            .collect()
    }

    /// Every resolvable name, aliases included.
    pub fn names(&self) -> Vec<&'static str> {
        all_names()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }
}
