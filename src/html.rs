use maud::{DOCTYPE, Markup, PreEscaped, html};

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};

// Table styles
pub const TABLE_HEADER_STYLE: &str = "table-header";
pub const TABLE_ROW_STYLE: &str = "table-row";
pub const TABLE_CELL_STYLE: &str = "table-cell";

// Page container
pub const PAGE_CONTAINER_STYLE: &str = "page";

const PAGE_STYLES: &str = r#"
    body {
        font-family: system-ui, sans-serif;
        margin: 0;
        background: #f9fafb;
        color: #111827;
    }
    .page {
        max-width: 960px;
        margin: 0 auto;
        padding: 2rem 1.5rem;
    }
    .cards {
        display: grid;
        grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
        gap: 1rem;
        margin: 1.5rem 0;
    }
    .card {
        background: white;
        border: 1px solid #e5e7eb;
        border-radius: 0.5rem;
        padding: 1rem;
    }
    .income { color: #16a34a; }
    .expense { color: #dc2626; }
    table {
        width: 100%;
        border-collapse: collapse;
    }
    .table-header {
        text-transform: uppercase;
        font-size: 0.75rem;
        background: #f3f4f6;
    }
    .table-row { border-bottom: 1px solid #e5e7eb; }
    .table-cell { padding: 0.75rem 1rem; text-align: left; }
    .bar-track {
        background: #e5e7eb;
        border-radius: 0.25rem;
        height: 0.75rem;
    }
    .bar {
        background: #dc2626;
        border-radius: 0.25rem;
        height: 100%;
    }
"#;

/// Wrap `content` in an HTML document with the shared page styles.
pub fn base(title: &str, content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Expense Tracker" }
                style { (PreEscaped(PAGE_STYLES)) }
            }

            body
            {
                (content)
            }
        }
    }
}

fn currency_formatter(prefix: &str) -> Option<Formatter> {
    Formatter::currency(prefix)
        .inspect_err(|error| tracing::error!("could not create currency formatter: {error:?}"))
        .ok()
        .map(|formatter| formatter.precision(Precision::Decimals(2)))
}

/// Format `number` as dollars with thousands separators and two decimal places.
pub fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();
    static NEGATIVE_FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    if number == 0.0 {
        // numfmt renders zero as "0"
        return "$0.00".to_owned();
    }

    let formatter = if number < 0.0 {
        NEGATIVE_FMT.get_or_init(|| currency_formatter("-$"))
    } else {
        POSITIVE_FMT.get_or_init(|| currency_formatter("$"))
    };

    let mut formatted_string = match formatter {
        Some(formatter) => formatter.fmt_string(number.abs()),
        None if number < 0.0 => return format!("-${:.2}", number.abs()),
        None => return format!("${number:.2}"),
    };

    // numfmt omits trailing zeros, e.g. "12.30" is rendered as "12.3".
    match formatted_string.find('.') {
        Some(point) => {
            let decimals = formatted_string.len() - point - 1;
            for _ in decimals..2 {
                formatted_string.push('0');
            }
        }
        None => formatted_string.push_str(".00"),
    }

    formatted_string
}
