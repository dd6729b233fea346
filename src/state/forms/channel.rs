//! Channel sign-up form

use super::demo_form::{ArraySection, DemoForm, FieldRow};
use crate::directory::{EmailAvailable, EmailDirectory};
use crate::form::{
    FieldArrayOptions, FieldKind, FieldOptions, FieldPath, FormController, FormError, FormOptions,
    Rules, ValidationMode, Value,
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*$")
        .unwrap()
});

/// Starting values of the sign-up form; `today` seeds the date of birth
pub fn channel_defaults(today: NaiveDate) -> Value {
    Value::object([
        ("username", Value::text("")),
        ("email", Value::text("")),
        ("channel", Value::text("")),
        (
            "social",
            Value::object([("twitter", Value::text("")), ("facebook", Value::text(""))]),
        ),
        (
            "phoneNumbers",
            Value::List(vec![Value::text(""), Value::text("")]),
        ),
        (
            "phNumbers",
            Value::List(vec![Value::object([("number", Value::text(""))])]),
        ),
        ("age", Value::Number(0.0)),
        ("dob", Value::Date(today)),
    ])
}

fn email_rules(directory: Arc<dyn EmailDirectory>) -> Rules {
    Rules::new()
        .pattern(EMAIL_PATTERN.clone(), "Invalid email format")
        .validate("notAdmin", |value, _| {
            if value.as_str() == Some("admin@mail.com") {
                Err("Enter a different email address".to_string())
            } else {
                Ok(())
            }
        })
        .validate("notBlackListed", |value, _| {
            if value.as_str().is_some_and(|email| email.ends_with("baddomain.com")) {
                Err("This domain is not supported".to_string())
            } else {
                Ok(())
            }
        })
        .validate_async("emailAvailable", EmailAvailable::new(directory))
}

/// Build the channel sign-up form
pub fn channel_form(
    directory: Arc<dyn EmailDirectory>,
    mode: ValidationMode,
    revalidate_mode: ValidationMode,
    today: NaiveDate,
) -> Result<DemoForm, FormError> {
    let mut form = FormController::new(FormOptions {
        default_values: channel_defaults(today),
        mode,
        revalidate_mode,
    });

    let required = |message: &str| Rules::new().required(message);
    form.register(
        &FieldPath::of("username"),
        FieldOptions::text().rules(required("Username is required")),
    )?;
    form.register(
        &FieldPath::of("email"),
        FieldOptions::text().rules(email_rules(directory)),
    )?;
    form.register(
        &FieldPath::of("channel"),
        FieldOptions::text().rules(required("Channel is required")),
    )?;
    for path in [
        "social.twitter",
        "social.facebook",
        "phoneNumbers.0",
        "phoneNumbers.1",
    ] {
        form.register(&FieldPath::of(path), FieldOptions::text())?;
    }
    form.register_array(
        &FieldPath::of("phNumbers"),
        FieldArrayOptions::new().field(FieldPath::of("number"), FieldOptions::text()),
    )?;
    form.register(
        &FieldPath::of("age"),
        FieldOptions::number().rules(required("Age is required")),
    )?;
    form.register(
        &FieldPath::of("dob"),
        FieldOptions::date().rules(required("Date of birth is required")),
    )?;

    DemoForm::new("Channel sign-up", form)
        .with_rows([
            FieldRow::text("username", "Username"),
            FieldRow::text("email", "Email"),
            FieldRow::text("channel", "Channel"),
            FieldRow::text("social.twitter", "Twitter"),
            FieldRow::text("social.facebook", "Facebook"),
            FieldRow::text("phoneNumbers.0", "Primary phone number"),
            FieldRow::text("phoneNumbers.1", "Secondary phone number"),
        ])
        .with_array(ArraySection {
            path: FieldPath::of("phNumbers"),
            label: "Phone",
            entry_field: FieldPath::of("number"),
            template: Value::object([("number", Value::text(""))]),
            keep: 1,
        })
        .with_rows([
            FieldRow::new("age", "Age", FieldKind::Number),
            FieldRow::new("dob", "Date of birth (YYYY-MM-DD)", FieldKind::Date),
        ])
        .with_gate("social.twitter", "channel")
}
