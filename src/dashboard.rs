//! The summary endpoint and the HTML dashboard page.
//!
//! Both are computed from every stored transaction and the month/category
//! filter in the query string. The overall totals ignore the filter, while the
//! transaction list, the filtered totals and the expenses by category use it.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    query::{
        ALL, CategoryTotal, DashboardView, FilterQuery, Summary, TransactionFilter, dashboard_view,
    },
    transaction::{Transaction, TransactionType, all_transactions},
};

/// The state needed for the summary endpoint and the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn load_dashboard(
    state: &DashboardState,
    query: &FilterQuery,
) -> Result<(DashboardView, TransactionFilter), Error> {
    let filter = TransactionFilter::try_from(query)?;

    let all = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        all_transactions(&connection)
            .inspect_err(|error| tracing::error!("could not list transactions: {error}"))?
    };

    Ok((dashboard_view(&all, &filter), filter))
}

/// A route handler for the totals, chart data and filter options.
pub async fn get_summary_endpoint(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Result<Json<DashboardView>, Error> {
    load_dashboard(&state, &query).map(|(view, _)| Json(view))
}

/// Display the transactions with the summary cards and the expenses by category chart.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Query(query): Query<FilterQuery>,
) -> Result<Markup, Error> {
    let (view, filter) = load_dashboard(&state, &query)?;

    Ok(dashboard_page(&view, &filter))
}

fn dashboard_page(view: &DashboardView, filter: &TransactionFilter) -> Markup {
    let selected_month = filter.month.to_string();
    let selected_category = filter.category.to_string();
    let is_filtered = *filter != TransactionFilter::default();

    let content = html! {
        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 { "Expense Tracker" }

            form id="filters" method="get" action=(endpoints::ROOT)
            {
                label for="month" { "Month " }
                select id="month" name="month"
                {
                    option value=(ALL) selected[selected_month == ALL] { "All months" }
                    @for month in &view.months {
                        option value=(month) selected[*month == selected_month] { (month) }
                    }
                }

                label for="category" { " Category " }
                select id="category" name="category"
                {
                    option value=(ALL) selected[selected_category == ALL] { "All categories" }
                    @for category in &view.categories {
                        option value=(category) selected[*category == selected_category] { (category) }
                    }
                }

                " "
                button type="submit" { "Filter" }
                " "
                a href=(endpoints::EXPORT) download { "Export CSV" }
            }

            (summary_cards("overall", "All transactions", &view.overall))

            @if is_filtered {
                (summary_cards("filtered", "Selected transactions", &view.filtered))
            }

            (expenses_chart(&view.expenses_by_category))

            (transactions_table(&view.transactions))
        }
    };

    base("Dashboard", &content)
}

fn summary_cards(id: &str, heading: &str, summary: &Summary) -> Markup {
    html! {
        section id=(id)
        {
            h2 { (heading) }

            div class="cards"
            {
                div class="card"
                {
                    h3 { "Income" }
                    p class="income" { (format_currency(summary.income)) }
                }
                div class="card"
                {
                    h3 { "Expenses" }
                    p class="expense" { (format_currency(summary.expense)) }
                }
                div class="card"
                {
                    h3 { "Balance" }
                    p class=(if summary.balance < 0.0 { "expense" } else { "income" })
                    {
                        (format_currency(summary.balance))
                    }
                }
            }
        }
    }
}

fn expenses_chart(totals: &[CategoryTotal]) -> Markup {
    let largest = totals.iter().map(|total| total.total).fold(0.0, f64::max);

    html! {
        section id="expenses-by-category"
        {
            h2 { "Expenses by Category" }

            @if totals.is_empty() {
                p { "No expenses to show." }
            } @else {
                table
                {
                    tbody
                    {
                        @for total in totals {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (total.category) }
                                td class=(TABLE_CELL_STYLE) style="width: 60%"
                                {
                                    div class="bar-track"
                                    {
                                        div
                                            class="bar"
                                            style=(format!("width: {:.1}%", bar_width(total.total, largest)))
                                        {}
                                    }
                                }
                                td class=(TABLE_CELL_STYLE) { (format_currency(total.total)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The bar length as a percentage of the largest category.
fn bar_width(total: f64, largest: f64) -> f64 {
    if largest <= 0.0 {
        0.0
    } else {
        (total / largest * 100.0).clamp(0.0, 100.0)
    }
}

/// Expenses are shown as negative amounts.
fn signed_amount(transaction: &Transaction) -> (&'static str, f64) {
    match transaction.transaction_type {
        TransactionType::Income => ("income", transaction.amount),
        TransactionType::Expense => ("expense", -transaction.amount),
    }
}

fn transactions_table(transactions: &[Transaction]) -> Markup {
    html! {
        section id="transactions"
        {
            h2 { "Transactions" }

            @if transactions.is_empty() {
                p { "No transactions found." }
            } @else {
                table
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Note" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions {
                            tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
                            {
                                td class=(TABLE_CELL_STYLE) { (transaction.date) }
                                td class=(TABLE_CELL_STYLE) { (transaction.transaction_type) }
                                td class=(TABLE_CELL_STYLE) { (transaction.category) }
                                td class=(TABLE_CELL_STYLE) { (transaction.note) }
                                @let (amount_style, amount) = signed_amount(transaction);
                                td class={(TABLE_CELL_STYLE) " " (amount_style)}
                                {
                                    (format_currency(amount))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
