//! Table definitions for the loan_io dataset, plus the shared column mappings
//! and filter predicates the query templates are built from.
//!
//! The loan and transaction tables store conceptually similar fields under
//! different column names and encodings, so mappings and predicates are kept in
//! separate per-domain enums. A loan mapping cannot be spliced into a
//! transaction query by accident.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATALOG: &str = "efeld_cuj";
pub const DEFAULT_SCHEMA: &str = "loan_io";

/// `catalog.schema` prefix used to fully qualify table names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNamespace {
    pub catalog: String,
    pub schema: String,
}

impl TableNamespace {
    pub fn new(catalog: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
        }
    }

    /// Fully-qualified name of a table in this namespace.
    pub fn qualify(&self, table: Table) -> String {
        format!("{}.{}.{}", self.catalog, self.schema, table.as_str())
    }
}

impl Default for TableNamespace {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG, DEFAULT_SCHEMA)
    }
}

impl fmt::Display for TableNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.catalog, self.schema)
    }
}

/// The three warehouse tables the dashboard reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    HistoricalLoans,
    RawTransactions,
    RefAccounting,
}

impl Table {
    pub const ALL: [Table; 3] = [
        Table::HistoricalLoans,
        Table::RawTransactions,
        Table::RefAccounting,
    ];

    /// Short (unqualified) table name.
    pub fn as_str(self) -> &'static str {
        match self {
            Table::HistoricalLoans => "historical_loans",
            Table::RawTransactions => "raw_transactions",
            Table::RefAccounting => "ref_accounting",
        }
    }

    /// Parse a short or fully-qualified table name.
    pub fn from_name(name: &str) -> Option<Table> {
        let short = name.rsplit('.').next().unwrap_or(name).trim();
        Table::ALL.into_iter().find(|t| t.as_str() == short)
    }

    /// Expected column layout.
    pub fn schema(self) -> TableSchema {
        match self {
            Table::HistoricalLoans => historical_loans_schema(),
            Table::RawTransactions => raw_transactions_schema(),
            Table::RefAccounting => ref_accounting_schema(),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: &'static str,
    pub data_type: &'static str,
    pub comment: Option<&'static str>,
    pub nullable: bool,
}

impl ColumnInfo {
    const fn new(name: &'static str, data_type: &'static str, comment: &'static str) -> Self {
        Self {
            name,
            data_type,
            comment: Some(comment),
            nullable: true,
        }
    }
}

const NUMERIC_TYPES: &[&str] = &["LONG", "INT", "DOUBLE", "FLOAT", "DECIMAL"];
const DATE_INDICATORS: &[&str] = &["_d", "_date", "issue_d", "earliest_cr_line"];

/// Expected layout of one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableSchema {
    pub table: Table,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Option<&'static str>,
    pub description: &'static str,
}

impl TableSchema {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    /// Columns declared with a numeric type.
    pub fn numeric_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| NUMERIC_TYPES.contains(&c.data_type))
            .map(|c| c.name)
            .collect()
    }

    /// Columns declared as strings.
    pub fn string_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.data_type == "STRING")
            .map(|c| c.name)
            .collect()
    }

    /// String columns that hold dates.
    pub fn date_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| {
                c.data_type == "STRING" && DATE_INDICATORS.iter().any(|ind| c.name.contains(ind))
            })
            .map(|c| c.name)
            .collect()
    }
}

fn historical_loans_schema() -> TableSchema {
    TableSchema {
        table: Table::HistoricalLoans,
        columns: vec![
            ColumnInfo::new("id", "LONG", "Unique loan identifier"),
            ColumnInfo::new("member_id", "INT", "Member identifier"),
            ColumnInfo::new("loan_amnt", "STRING", "Loan amount (cast to numeric)"),
            ColumnInfo::new("funded_amnt", "STRING", "Funded amount (cast to numeric)"),
            ColumnInfo::new("term", "STRING", "Loan term"),
            ColumnInfo::new("int_rate", "STRING", "Interest rate (cast to numeric)"),
            ColumnInfo::new("grade", "STRING", "Loan grade (A-G)"),
            ColumnInfo::new("sub_grade", "STRING", "Loan sub-grade"),
            ColumnInfo::new("purpose", "STRING", "Loan purpose"),
            ColumnInfo::new("loan_status", "STRING", "Current loan status"),
            ColumnInfo::new("issue_d", "STRING", "Issue date"),
            ColumnInfo::new("addr_state", "STRING", "Borrower state"),
            ColumnInfo::new("annual_inc", "DOUBLE", "Annual income"),
            ColumnInfo::new("emp_length", "STRING", "Employment length"),
            ColumnInfo::new("home_ownership", "STRING", "Home ownership status"),
            ColumnInfo::new("verification_status", "STRING", "Income verification status"),
            ColumnInfo::new("total_pymnt", "DOUBLE", "Total payments received"),
            ColumnInfo::new("installment", "DOUBLE", "Monthly installment"),
            ColumnInfo::new("dti", "DOUBLE", "Debt-to-income ratio"),
            ColumnInfo::new("accounting_treatment_id", "INT", "Accounting treatment ID"),
        ],
        primary_key: Some("id"),
        description: "Historical loan data with borrower and loan characteristics",
    }
}

fn raw_transactions_schema() -> TableSchema {
    TableSchema {
        table: Table::RawTransactions,
        columns: vec![
            ColumnInfo::new("id", "STRING", "Unique transaction identifier"),
            ColumnInfo::new("accounting_treatment_id", "STRING", "Accounting treatment ID"),
            ColumnInfo::new("balance", "STRING", "Account balance (cast to numeric)"),
            ColumnInfo::new("accrued_interest", "STRING", "Accrued interest (cast to numeric)"),
            ColumnInfo::new("arrears_balance", "STRING", "Arrears balance (cast to numeric)"),
            ColumnInfo::new("date", "STRING", "Transaction date"),
            ColumnInfo::new("status", "STRING", "Transaction status"),
            ColumnInfo::new("type", "STRING", "Transaction type"),
            ColumnInfo::new("purpose", "STRING", "Transaction purpose"),
            ColumnInfo::new("state_code", "STRING", "State code"),
            ColumnInfo::new("base_rate", "STRING", "Base rate"),
            ColumnInfo::new("cost_center_code", "STRING", "Cost center"),
            ColumnInfo::new(
                "acc_fv_change_before_taxes",
                "STRING",
                "FV change before taxes (cast to numeric)",
            ),
        ],
        primary_key: Some("id"),
        description: "Accounting and financial transaction data",
    }
}

fn ref_accounting_schema() -> TableSchema {
    TableSchema {
        table: Table::RefAccounting,
        columns: vec![
            ColumnInfo::new("id", "LONG", "Unique identifier"),
            ColumnInfo::new("accounting_treatment", "STRING", "Accounting treatment description"),
        ],
        primary_key: Some("id"),
        description: "Reference lookup table for accounting treatments",
    }
}

/// Semantic fields of `historical_loans`. Amounts and rates are stored as
/// strings there (rates carry a `%` suffix).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanField {
    LoanAmount,
    InterestRate,
    FundedAmount,
    IssueDate,
    BorrowerId,
}

impl LoanField {
    pub const ALL: [LoanField; 5] = [
        LoanField::LoanAmount,
        LoanField::InterestRate,
        LoanField::FundedAmount,
        LoanField::IssueDate,
        LoanField::BorrowerId,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LoanField::LoanAmount => "loan_amount",
            LoanField::InterestRate => "interest_rate",
            LoanField::FundedAmount => "funded_amount",
            LoanField::IssueDate => "issue_date",
            LoanField::BorrowerId => "borrower_id",
        }
    }

    /// SQL expression for this field.
    pub fn expr(self) -> &'static str {
        match self {
            LoanField::LoanAmount => "CAST(loan_amnt AS DOUBLE)",
            LoanField::InterestRate => "CAST(REPLACE(int_rate, '%', '') AS DOUBLE)",
            LoanField::FundedAmount => "CAST(funded_amnt AS DOUBLE)",
            LoanField::IssueDate => "TO_DATE(issue_d, 'MMM-yyyy')",
            LoanField::BorrowerId => "member_id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Semantic fields of `raw_transactions`. Values are plain numeric strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionField {
    Balance,
    Interest,
    Arrears,
    FvChange,
    Date,
}

impl TransactionField {
    pub const ALL: [TransactionField; 5] = [
        TransactionField::Balance,
        TransactionField::Interest,
        TransactionField::Arrears,
        TransactionField::FvChange,
        TransactionField::Date,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TransactionField::Balance => "transaction_balance",
            TransactionField::Interest => "transaction_interest",
            TransactionField::Arrears => "arrears_amount",
            TransactionField::FvChange => "fv_change",
            TransactionField::Date => "transaction_date",
        }
    }

    pub fn expr(self) -> &'static str {
        match self {
            TransactionField::Balance => "CAST(balance AS DOUBLE)",
            TransactionField::Interest => "CAST(accrued_interest AS DOUBLE)",
            TransactionField::Arrears => "CAST(arrears_balance AS DOUBLE)",
            TransactionField::FvChange => "CAST(acc_fv_change_before_taxes AS DOUBLE)",
            TransactionField::Date => "TO_DATE(date, 'yyyy-MM-dd')",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Row filters for `historical_loans`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanCondition {
    ValidLoans,
    RecentLoans,
    ValidStatus,
    ValidState,
    ValidGrade,
    ValidPurpose,
}

impl LoanCondition {
    pub const ALL: [LoanCondition; 6] = [
        LoanCondition::ValidLoans,
        LoanCondition::RecentLoans,
        LoanCondition::ValidStatus,
        LoanCondition::ValidState,
        LoanCondition::ValidGrade,
        LoanCondition::ValidPurpose,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LoanCondition::ValidLoans => "valid_loans",
            LoanCondition::RecentLoans => "recent_loans",
            LoanCondition::ValidStatus => "valid_status",
            LoanCondition::ValidState => "valid_state",
            LoanCondition::ValidGrade => "valid_grade",
            LoanCondition::ValidPurpose => "valid_purpose",
        }
    }

    /// SQL boolean predicate.
    pub fn predicate(self) -> &'static str {
        match self {
            LoanCondition::ValidLoans => "loan_amnt IS NOT NULL AND CAST(loan_amnt AS DOUBLE) > 0",
            LoanCondition::RecentLoans => "issue_d IS NOT NULL",
            LoanCondition::ValidStatus => "loan_status IS NOT NULL",
            LoanCondition::ValidState => "addr_state IS NOT NULL AND addr_state != ''",
            LoanCondition::ValidGrade => "grade IS NOT NULL AND grade != ''",
            LoanCondition::ValidPurpose => "purpose IS NOT NULL AND purpose != ''",
        }
    }
}

/// Row filters for `raw_transactions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCondition {
    NonZeroBalance,
    PresentBalance,
    PresentInterest,
    PresentPurpose,
    PresentState,
}

impl TransactionCondition {
    pub const ALL: [TransactionCondition; 5] = [
        TransactionCondition::NonZeroBalance,
        TransactionCondition::PresentBalance,
        TransactionCondition::PresentInterest,
        TransactionCondition::PresentPurpose,
        TransactionCondition::PresentState,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TransactionCondition::NonZeroBalance => "nonzero_balance",
            TransactionCondition::PresentBalance => "present_balance",
            TransactionCondition::PresentInterest => "present_interest",
            TransactionCondition::PresentPurpose => "present_purpose",
            TransactionCondition::PresentState => "present_state",
        }
    }

    pub fn predicate(self) -> &'static str {
        match self {
            TransactionCondition::NonZeroBalance => {
                "balance IS NOT NULL AND CAST(balance AS DOUBLE) != 0"
            }
            TransactionCondition::PresentBalance => "balance IS NOT NULL AND balance != ''",
            TransactionCondition::PresentInterest => {
                "accrued_interest IS NOT NULL AND accrued_interest != ''"
            }
            TransactionCondition::PresentPurpose => "purpose IS NOT NULL",
            TransactionCondition::PresentState => "state_code IS NOT NULL",
        }
    }
}
