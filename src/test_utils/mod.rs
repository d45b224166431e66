#![allow(missing_docs)]

pub(crate) mod html;
pub(crate) mod state;

pub(crate) use html::{assert_valid_html, parse_html_document};
pub(crate) use state::{must_create_test_state, must_seed_transactions};
