//! Plain text rendering of the dashboard for the terminal.

use std::fmt::{self, Display, Formatter};

use crate::{
    client::state::ConnectionMode,
    html::format_currency,
    query::{ALL, CategoryTotal, DashboardView, Summary, TransactionFilter},
    transaction::{Transaction, TransactionType},
};

/// The number of characters used for the largest category bar.
pub const BAR_WIDTH: usize = 30;

/// The dashboard as it is printed by the `list` command.
pub struct DashboardText<'a> {
    /// The dashboard to print.
    pub view: &'a DashboardView,
    /// The filter the dashboard was computed with.
    pub filter: &'a TransactionFilter,
    /// Adds a notice when the data came from the local snapshot.
    pub mode: ConnectionMode,
}

impl Display for DashboardText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.mode == ConnectionMode::LocalOnly {
            writeln!(
                f,
                "Offline: showing the local snapshot, new records stay on this machine.\n"
            )?;
        }

        writeln!(
            f,
            "Months: {}",
            options(&self.view.months, &self.filter.month.to_string())
        )?;
        writeln!(
            f,
            "Categories: {}\n",
            options(&self.view.categories, &self.filter.category.to_string())
        )?;

        write_summary(f, "All transactions", &self.view.overall)?;
        if *self.filter != TransactionFilter::default() {
            write_summary(f, "Selected transactions", &self.view.filtered)?;
        }

        writeln!(f)?;
        write_transactions(f, &self.view.transactions)?;

        writeln!(f)?;
        write_category_bars(f, &self.view.expenses_by_category)
    }
}

/// List the options with the selected one in brackets.
fn options(values: &[String], selected: &str) -> String {
    std::iter::once(ALL)
        .chain(values.iter().map(String::as_str))
        .map(|value| {
            if value == selected {
                format!("[{value}]")
            } else {
                value.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_summary(f: &mut Formatter<'_>, heading: &str, summary: &Summary) -> fmt::Result {
    writeln!(
        f,
        "{heading}: income {}  expenses {}  balance {}",
        format_currency(summary.income),
        format_currency(summary.expense),
        format_currency(summary.balance)
    )
}

fn write_transactions(f: &mut Formatter<'_>, transactions: &[Transaction]) -> fmt::Result {
    if transactions.is_empty() {
        return writeln!(f, "No transactions found.");
    }

    writeln!(
        f,
        "{:>6}  {:<10}  {:<7}  {:<16}  {:>12}  Note",
        "ID", "Date", "Type", "Category", "Amount"
    )?;

    for transaction in transactions {
        let amount = match transaction.transaction_type {
            TransactionType::Income => transaction.amount,
            TransactionType::Expense => -transaction.amount,
        };

        writeln!(
            f,
            "{:>6}  {:<10}  {:<7}  {:<16}  {:>12}  {}",
            transaction.id,
            transaction.date.to_string(),
            transaction.transaction_type.as_str(),
            transaction.category,
            format_currency(amount),
            transaction.note
        )?;
    }

    Ok(())
}

fn write_category_bars(f: &mut Formatter<'_>, totals: &[CategoryTotal]) -> fmt::Result {
    writeln!(f, "Expenses by category")?;

    if totals.is_empty() {
        return writeln!(f, "No expenses to show.");
    }

    let largest = totals.iter().map(|total| total.total).fold(0.0, f64::max);
    let name_width = totals
        .iter()
        .map(|total| total.category.chars().count())
        .max()
        .unwrap_or(0);

    for total in totals {
        writeln!(
            f,
            "{:<name_width$}  {:<bar_width$}  {}",
            total.category,
            "#".repeat(bar_length(total.total, largest)),
            format_currency(total.total),
            bar_width = BAR_WIDTH,
        )?;
    }

    Ok(())
}

fn bar_length(total: f64, largest: f64) -> usize {
    if largest <= 0.0 || total <= 0.0 {
        return 0;
    }

    ((total / largest) * BAR_WIDTH as f64).round().clamp(1.0, BAR_WIDTH as f64) as usize
}
