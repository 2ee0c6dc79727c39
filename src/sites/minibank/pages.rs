// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Parsers for each page kind of the bank website.

use crate::browser::Page;
use crate::error::{Error, Result};
use crate::extract::{Column, Ctx, Field, Flow, ItemSpec, ListSpec, Node, Source};
use crate::mapper::{account_type_vocab, apply_patterns, document_type_vocab, french_patterns};
use crate::models::{Account, Document, Profile, Recipient, Subscription, Transaction, Transfer, TransferStatus};
use crate::utils::DecimalStyle;
use scraper::Selector;

fn first_text<K>(page: &Page<K>, css: &str) -> Option<String> {
    let sel = Selector::parse(css).ok()?;
    let doc = page.html();
    let text = doc
        .select(&sel)
        .next()
        .map(|el| crate::utils::clean_text(&el.text().collect::<String>()));
    text.filter(|t| !t.is_empty())
}

/// Error banner shown on forms (login, OTP, transfer code).
pub fn form_error<K>(page: &Page<K>) -> Option<String> {
    first_text(page, "div.error")
}

pub fn code_prompt<K>(page: &Page<K>) -> String {
    first_text(page, "p.prompt").unwrap_or_else(|| "Code".to_string())
}

pub fn maintenance_message<K>(page: &Page<K>) -> String {
    first_text(page, "h1, p").unwrap_or_else(|| "maintenance".to_string())
}

fn is_total_row(ctx: &Ctx<'_>) -> bool {
    match ctx.node {
        Node::Html(el) => el
            .value()
            .attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == "total")),
        Node::Json(_) => false,
    }
}

pub fn account_list() -> ListSpec<Account> {
    let item = ItemSpec::<Account>::new()
        .field(Field::non_empty("id", Source::cell("number")), |a, v| a.id = v)
        .field(Field::text("label", Source::cell("label")), |a, v| a.label = v)
        .field(
            Field::map("kind", Source::cell("label"), account_type_vocab().shared()),
            |a, v| a.kind = v,
        )
        .field(
            Field::decimal("balance", Source::cell("balance"), DecimalStyle::French),
            |a, v| a.balance = v,
        )
        .optional_field(
            Field::non_empty("currency", Source::cell("currency")).default("EUR".to_string()),
            |a, v| a.currency = v,
        )
        .optional_field(Field::non_empty("iban", Source::attr("", "data-iban")).optional(), |a, v| {
            a.iban = v
        })
        .optional_field(
            Field::decimal("coming", Source::cell("coming"), DecimalStyle::French).optional(),
            |a, v| a.coming = v,
        )
        .condition(|ctx| !is_total_row(ctx))
        .skip_optional_errors(true);

    ListSpec::css("table#accounts tbody tr", item)
        .table(
            "table#accounts thead th",
            vec![
                Column::new("number", &["compte", "n° de compte"]),
                Column::new("label", &["libellé", "intitulé"]),
                Column::new("balance", &["solde"]),
                Column::new("currency", &["devise"]),
                Column::new("coming", &["à venir", "en cours"]),
            ],
        )
        .unique_by(|a| a.id.clone())
        .empty_selector("p.no-accounts")
}

/// History and coming operations share one table layout.
pub fn operation_list() -> ListSpec<Transaction> {
    let item = ItemSpec::<Transaction>::new()
        .field(Field::text("id", Source::attr("", "data-id")).default(String::new()), |t, v| {
            t.id = v
        })
        .field(Field::date_dmy("date", Source::cell("date")), |t, v| t.date = Some(v))
        .field(Field::non_empty("raw", Source::cell("label")), |t, v| t.raw = v)
        .field(
            Field::decimal("amount", Source::cell("amount"), DecimalStyle::French),
            |t, v| t.amount = v,
        )
        .with("kind", |_, t| {
            apply_patterns(t, french_patterns());
            Ok(Flow::Continue)
        })
        .condition(|ctx| !is_total_row(ctx));

    ListSpec::css("table#history tbody tr", item)
        .table(
            "table#history thead th",
            vec![
                Column::new("date", &["date", "date opération"]),
                Column::new("label", &["libellé", "opération"]),
                Column::new("amount", &["montant"]),
            ],
        )
        .next_page(Field::text("next", Source::attr("a.next", "href")))
        .unique_by(|t| t.id.clone())
        .ignore_duplicate()
        .empty_selector("p.no-operations")
}

pub fn recipient_list() -> ListSpec<Recipient> {
    let item = ItemSpec::<Recipient>::new()
        .field(Field::non_empty("id", Source::attr("", "data-id")), |r, v| r.id = v)
        .field(Field::text("label", Source::css("span.label")), |r, v| r.label = v)
        .optional_field(
            Field::non_empty("iban", Source::css("span.iban")).replace(" ", "").optional(),
            |r, v| r.iban = v,
        )
        .optional_field(Field::non_empty("bank", Source::css("span.bank")).optional(), |r, v| {
            r.bank_name = v
        })
        .optional_field(Field::date_dmy("enabled_at", Source::css("span.since")).optional(), |r, v| {
            r.enabled_at = v
        })
        .condition(|ctx| match ctx.node {
            Node::Html(el) => el.value().attr("data-disabled").is_none(),
            Node::Json(_) => true,
        })
        .skip_optional_errors(true);

    ListSpec::css("ul#recipients li", item)
        .unique_by(|r| r.id.clone())
        .empty_selector("p.no-recipients")
}

/// Summary shown after the transfer form or the code check, and on the
/// final confirmation page.
pub fn transfer_summary<K>(page: &Page<K>, requested: &Transfer, status: TransferStatus) -> Result<Transfer> {
    let item = ItemSpec::<Transfer>::new()
        .field(Field::non_empty("id", Source::attr("div#transfer", "data-id")), |t, v| {
            t.id = Some(v)
        })
        .field(
            Field::decimal("amount", Source::css("div#transfer span.amount"), DecimalStyle::French),
            |t, v| t.amount = v,
        )
        .field(Field::text("label", Source::css("div#transfer span.label")), |t, v| t.label = v)
        .optional_field(
            Field::date_dmy("exec_date", Source::css("div#transfer span.date")).optional(),
            |t, v| t.exec_date = v,
        );
    let mut transfer = item
        .parse_html(&page.html())?
        .ok_or_else(|| Error::UnexpectedPage(page.url.clone()))?;
    if transfer.amount != requested.amount {
        return Err(Error::TransferInvalid(format!(
            "site validated {} instead of {}",
            transfer.amount, requested.amount
        )));
    }
    transfer.account_id = requested.account_id.clone();
    transfer.recipient_id = requested.recipient_id.clone();
    if transfer.label.is_empty() {
        transfer.label = requested.label.clone();
    }
    transfer.status = status;
    Ok(transfer)
}

pub fn subscription_list() -> ListSpec<Subscription> {
    let item = ItemSpec::<Subscription>::new()
        .field(Field::non_empty("id", Source::json("id")), |s, v| s.id = v)
        .field(Field::text("label", Source::json("label")), |s, v| s.label = v)
        .optional_field(Field::non_empty("subscriber", Source::json("subscriber")).optional(), |s, v| {
            s.subscriber = v
        });
    ListSpec::json("subscriptions", item).unique_by(|s| s.id.clone())
}

pub fn document_list() -> ListSpec<Document> {
    let item = ItemSpec::<Document>::new()
        .field(Field::non_empty("id", Source::json("id")), |d, v| d.id = v)
        .field(Field::date("date", Source::json("date"), "%Y-%m-%d").optional(), |d, v| {
            d.date = v
        })
        .field(Field::text("label", Source::json("label")), |d, v| d.label = v)
        .field(
            Field::map("kind", Source::json("label"), document_type_vocab().shared()),
            |d, v| d.kind = v,
        )
        .field(
            Field::non_empty("format", Source::json("format"))
                .filter(crate::extract::TextFilter::Lower)
                .default("pdf".to_string()),
            |d, v| d.format = v,
        )
        .field(Field::non_empty("url", Source::json("url")).optional(), |d, v| {
            d.url = v
        })
        .with("has_file", |_, d| {
            d.has_file = d.url.is_some();
            Ok(Flow::Continue)
        });
    ListSpec::json("documents", item)
        .unique_by(|d| d.id.clone())
        .ignore_duplicate()
}

pub fn profile(doc: &serde_json::Value) -> Result<Profile> {
    let item = ItemSpec::<Profile>::new()
        .field(Field::non_empty("name", Source::json("name")), |p, v| p.name = v)
        .field(Field::non_empty("email", Source::json("email")).optional(), |p, v| {
            p.email = v
        })
        .field(Field::non_empty("phone", Source::json("phone")).optional(), |p, v| {
            p.phone = v
        })
        .field(Field::non_empty("address", Source::json("address/full")).optional(), |p, v| {
            p.address = v
        });
    item.parse_json(doc)?
        .ok_or_else(|| Error::NotFound("profile".to_string()))
}
