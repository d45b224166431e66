//! Filtering and aggregation of transactions.
//!
//! These functions are pure and work on slices of [Transaction], so the
//! server and the client compute the same list, summaries and chart data.

use std::{collections::BTreeSet, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    transaction::{Transaction, TransactionType},
};

/// The query value that disables a filter.
pub const ALL: &str = "all";

/// A half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first date in the range.
    pub start: Date,
    /// The first date after the range.
    pub end: Date,
}

impl DateRange {
    /// Whether `date` falls within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date < self.end
    }
}

/// Selects transactions by calendar month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MonthFilter {
    /// Every month.
    #[default]
    All,
    /// A single calendar month.
    Month {
        /// The calendar year.
        year: i32,
        /// The month of `year`.
        month: Month,
    },
}

impl MonthFilter {
    /// The dates covered by the filter, `None` for [MonthFilter::All].
    ///
    /// The range ends on the first day of the following month, so December
    /// ends on the first of January in the next year.
    pub fn date_range(&self) -> Option<DateRange> {
        let MonthFilter::Month { year, month } = *self else {
            return None;
        };

        let start = Date::from_calendar_date(year, month, 1).ok()?;
        let end = match month {
            Month::December => Date::from_calendar_date(year + 1, Month::January, 1).ok()?,
            month => Date::from_calendar_date(year, month.next(), 1).ok()?,
        };

        Some(DateRange { start, end })
    }

    /// Whether `date` is selected by the filter.
    pub fn matches(&self, date: Date) -> bool {
        match self.date_range() {
            Some(range) => range.contains(date),
            None => matches!(self, MonthFilter::All),
        }
    }
}

impl FromStr for MonthFilter {
    type Err = Error;

    /// Parse `YYYY-MM`, `all`, or an empty string (same as `all`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() || s == ALL {
            return Ok(MonthFilter::All);
        }

        let invalid = || Error::InvalidMonth(s.to_owned());

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;

        let is_digits = |text: &str, len: usize| {
            text.len() == len && text.bytes().all(|byte| byte.is_ascii_digit())
        };

        if !is_digits(year, 4) || !is_digits(month, 2) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        let filter = MonthFilter::Month { year, month };

        // The month must have a representable end date, e.g. not 9999-12.
        if filter.date_range().is_none() {
            return Err(invalid());
        }

        Ok(filter)
    }
}

impl std::fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonthFilter::All => f.write_str(ALL),
            MonthFilter::Month { year, month } => write!(f, "{year:04}-{:02}", *month as u8),
        }
    }
}

/// Selects transactions by exact category name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Every category.
    #[default]
    All,
    /// Only the category with this exact name.
    Named(String),
}

impl CategoryFilter {
    /// Create a filter from a query value, `all` and the empty string select every category.
    pub fn new(value: &str) -> Self {
        if value.is_empty() || value == ALL {
            CategoryFilter::All
        } else {
            CategoryFilter::Named(value.to_owned())
        }
    }

    /// The category name to match, `None` for [CategoryFilter::All].
    pub fn name(&self) -> Option<&str> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Named(name) => Some(name),
        }
    }

    /// Whether `category` is selected by the filter.
    pub fn matches(&self, category: &str) -> bool {
        self.name().is_none_or(|name| name == category)
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name().unwrap_or(ALL))
    }
}

/// The month and category filters, combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// The month to select.
    pub month: MonthFilter,
    /// The category to select.
    pub category: CategoryFilter,
}

impl TransactionFilter {
    /// Build a filter from the raw query values, missing values select everything.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if `month` is not `all` or `YYYY-MM`.
    pub fn parse(month: Option<&str>, category: Option<&str>) -> Result<Self, Error> {
        Ok(Self {
            month: month
                .map(str::parse::<MonthFilter>)
                .transpose()?
                .unwrap_or_default(),
            category: category.map(CategoryFilter::new).unwrap_or_default(),
        })
    }

    /// Whether `transaction` is selected by both filters.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.month.matches(transaction.date) && self.category.matches(&transaction.category)
    }
}

/// The query string parameters used to filter transactions.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FilterQuery {
    /// `YYYY-MM` or `all`.
    pub month: Option<String>,
    /// A category name or `all`.
    pub category: Option<String>,
}

impl TryFrom<&FilterQuery> for TransactionFilter {
    type Error = Error;

    fn try_from(query: &FilterQuery) -> Result<Self, Self::Error> {
        TransactionFilter::parse(query.month.as_deref(), query.category.as_deref())
    }
}

/// Sort transactions with the most recent date first.
///
/// Transactions on the same date are ordered by ascending ID.
pub fn sort_transactions(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(a.id.cmp(&b.id)));
}

/// Select the transactions matching `filter`, sorted with [sort_transactions].
pub fn filter_transactions(
    transactions: &[Transaction],
    filter: &TransactionFilter,
) -> Vec<Transaction> {
    let mut selected: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .cloned()
        .collect();

    sort_transactions(&mut selected);

    selected
}

/// Income, expense and balance totals for a set of transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// The sum of income amounts.
    pub income: f64,
    /// The sum of expense amounts.
    pub expense: f64,
    /// `income - expense`.
    pub balance: f64,
}

/// Total the income and expenses in `transactions`.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let (income, expense) =
        transactions
            .iter()
            .fold((0.0, 0.0), |(income, expense), transaction| {
                match transaction.transaction_type {
                    TransactionType::Income => (income + transaction.amount, expense),
                    TransactionType::Expense => (income, expense + transaction.amount),
                }
            });

    Summary {
        income,
        expense,
        balance: income - expense,
    }
}

/// The total spent in one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// The category name.
    pub category: String,
    /// The sum of expense amounts in the category.
    pub total: f64,
}

/// Sum expense amounts per category.
///
/// Categories appear in the order they first occur in `transactions`. Income
/// is ignored, so the result is empty when there are no expenses.
pub fn expenses_by_category(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for transaction in transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Expense)
    {
        match totals
            .iter_mut()
            .find(|total| total.category == transaction.category)
        {
            Some(total) => total.total += transaction.amount,
            None => totals.push(CategoryTotal {
                category: transaction.category.clone(),
                total: transaction.amount,
            }),
        }
    }

    totals
}

/// The distinct months of the transaction dates as `YYYY-MM`, most recent first.
pub fn distinct_months(transactions: &[Transaction]) -> Vec<String> {
    let months: BTreeSet<(i32, u8)> = transactions
        .iter()
        .map(|transaction| (transaction.date.year(), transaction.date.month() as u8))
        .collect();

    months
        .into_iter()
        .rev()
        .map(|(year, month)| format!("{year:04}-{month:02}"))
        .collect()
}

/// The distinct categories in alphabetical order.
pub fn distinct_categories(transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .map(|transaction| transaction.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Everything needed to display the transactions page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// The transactions selected by the filter, most recent first.
    pub transactions: Vec<Transaction>,
    /// Totals over every transaction, independent of the filter.
    pub overall: Summary,
    /// Totals over the selected transactions.
    pub filtered: Summary,
    /// Expenses per category over the selected transactions.
    pub expenses_by_category: Vec<CategoryTotal>,
    /// The months available to filter by.
    pub months: Vec<String>,
    /// The categories available to filter by.
    pub categories: Vec<String>,
}

/// Build the dashboard from every known transaction and the active filter.
pub fn dashboard_view(all: &[Transaction], filter: &TransactionFilter) -> DashboardView {
    let transactions = filter_transactions(all, filter);

    DashboardView {
        overall: summarize(all),
        filtered: summarize(&transactions),
        expenses_by_category: expenses_by_category(&transactions),
        months: distinct_months(all),
        categories: distinct_categories(all),
        transactions,
    }
}
